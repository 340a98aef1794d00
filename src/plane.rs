//! Plane calibration: least-squares tilt removal over valid pixels.
//!
//! The sensor and its mount are never perfectly square to the target, so the
//! ROI of a flat target shows up as a tilted plane. Fitting `z = a·x + b·y + c`
//! and removing the `a·x + b·y` part keeps the local depth deviation and the
//! absolute depth level `c` while cancelling the tilt. This runs before the
//! noise filters and before the sample is reduced to its mean.
use crate::error::{CompensationError, Result};
use crate::extract::DepthSample;
use log::debug;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

const SINGULAR_EPS: f64 = 1e-12;

/// Plane `z = a·x + b·y + c` in ROI pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl PlaneFit {
    #[inline]
    pub fn at(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y + self.c
    }

    /// Tilt component only (`a·x + b·y`).
    #[inline]
    pub fn tilt_at(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y
    }
}

/// Ordinary least squares over the valid pixels of `sample`.
///
/// Coordinates are centred before accumulating the normal equations to keep
/// them well conditioned on large ROIs. Needs at least three valid pixels.
/// A rank-deficient design (a single row or column, or any collinear set)
/// yields the minimum-norm solution, so the degenerate slope comes out as 0.
pub fn fit_plane(sample: &DepthSample) -> Result<PlaneFit> {
    let n = sample.valid_count();
    if n < 3 {
        return Err(CompensationError::InvalidData(format!(
            "plane fit needs at least 3 valid pixels, got {n}"
        )));
    }

    let (mut sx, mut sy, mut sz) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y, z) in sample.valid_pixels() {
        sx += x as f64;
        sy += y as f64;
        sz += z;
    }
    let inv_n = 1.0 / n as f64;
    let (mx, my, mz) = (sx * inv_n, sy * inv_n, sz * inv_n);

    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for (x, y, z) in sample.valid_pixels() {
        let row = Vector3::new(x as f64 - mx, y as f64 - my, 1.0);
        ata += row * row.transpose();
        atb += row * (z - mz);
    }

    let scale = ata.abs().max().max(1.0);
    let svd = ata.svd(true, true);
    let rank = svd.rank(SINGULAR_EPS * scale);
    if rank < 3 {
        debug!("plane fit: rank-deficient design (rank {rank}, {n} pixels), minimum-norm solution");
    }
    let sol = svd.solve(&atb, SINGULAR_EPS * scale).map_err(|e| {
        CompensationError::InvalidData(format!("plane fit normal equations: {e}"))
    })?;

    let (a, b, c_centered) = (sol[0], sol[1], sol[2] + mz);
    Ok(PlaneFit {
        a,
        b,
        c: c_centered - a * mx - b * my,
    })
}

/// Subtract the fitted tilt from every valid value; invalid entries are kept.
pub fn remove_tilt(sample: &DepthSample, plane: &PlaneFit) -> DepthSample {
    let mut out = sample.clone();
    let w = sample.width.max(1);
    for (i, (v, &ok)) in out.values.iter_mut().zip(&sample.valid).enumerate() {
        if ok {
            *v -= plane.tilt_at((i % w) as f64, (i / w) as f64);
        }
    }
    out
}

/// Peak-to-valley of the valid residuals against `plane`.
pub fn flatness(sample: &DepthSample, plane: &PlaneFit) -> Option<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (x, y, z) in sample.valid_pixels() {
        let r = z - plane.at(x as f64, y as f64);
        lo = lo.min(r);
        hi = hi.max(r);
    }
    (lo <= hi).then_some(hi - lo)
}
