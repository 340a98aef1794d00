//! Best-fit-straight-line (BFSL) linearity.
//!
//! Both sequences are zero-referenced by their first element, a least-squares
//! line `measured = slope·actual + intercept` is fitted, and linearity is the
//! largest absolute deviation from that line as a percentage of full scale.
use crate::error::{CompensationError, Result};
use crate::params::Defaults;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearityResult {
    /// `abs_max_deviation / full_scale × 100`.
    pub linearity: f64,
    pub max_deviation: f64,
    pub min_deviation: f64,
    pub abs_max_deviation: f64,
    pub rms_error: f64,
    pub mae: f64,
    pub r_squared: f64,
    pub slope: f64,
    pub intercept: f64,
}

/// Linearity before and after compensation of the same dataset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompensationEffect {
    pub before: LinearityResult,
    pub after: LinearityResult,
    /// Relative reduction of the linearity figure in percent.
    pub improvement: f64,
}

/// Subtract the first element from every element.
pub fn normalize_to_relative(values: &[f64]) -> Vec<f64> {
    match values.first() {
        Some(&first) => values.iter().map(|v| v - first).collect(),
        None => Vec::new(),
    }
}

fn resolve_full_scale(full_scale: Option<f64>) -> f64 {
    match full_scale {
        Some(fs) if fs > 0.0 && fs.is_finite() => fs,
        _ => Defaults::STANDARD.full_scale,
    }
}

fn validate(actual: &[f64], measured: &[f64]) -> Result<()> {
    if actual.len() < 2 {
        return Err(CompensationError::InvalidData(format!(
            "linear regression needs at least 2 points, got {}",
            actual.len()
        )));
    }
    if actual.len() != measured.len() {
        return Err(CompensationError::InvalidData(format!(
            "actual/measured length mismatch: {} vs {}",
            actual.len(),
            measured.len()
        )));
    }
    if actual.iter().any(|v| !v.is_finite()) {
        return Err(CompensationError::InvalidData(
            "actual values contain NaN or Inf".into(),
        ));
    }
    if measured.iter().any(|v| !v.is_finite()) {
        return Err(CompensationError::InvalidData(
            "measured values contain NaN or Inf".into(),
        ));
    }
    if actual.iter().all(|&v| v == actual[0]) {
        return Err(CompensationError::InvalidData(
            "all actual values are identical; cannot fit a line".into(),
        ));
    }
    Ok(())
}

/// BFSL linearity of `measured` against `actual`.
///
/// `full_scale` falls back to 41 mm when absent or not positive.
pub fn calculate_linearity(
    actual: &[f64],
    measured: &[f64],
    full_scale: Option<f64>,
) -> Result<LinearityResult> {
    validate(actual, measured)?;
    let full_scale = resolve_full_scale(full_scale);

    let x = normalize_to_relative(actual);
    let y = normalize_to_relative(measured);
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0f64, 0.0f64);
    for (xi, yi) in x.iter().zip(&y) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx) * (xi - mx);
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;

    let deviations: Vec<f64> = x
        .iter()
        .zip(&y)
        .map(|(xi, yi)| yi - (slope * xi + intercept))
        .collect();
    let max_deviation = deviations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_deviation = deviations.iter().copied().fold(f64::INFINITY, f64::min);
    let abs_max_deviation = max_deviation.abs().max(min_deviation.abs());

    let ss_res: f64 = deviations.iter().map(|d| d * d).sum();
    let ss_tot: f64 = y.iter().map(|yi| (yi - my) * (yi - my)).sum();
    let r_squared = if ss_tot != 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Ok(LinearityResult {
        linearity: abs_max_deviation / full_scale * 100.0,
        max_deviation,
        min_deviation,
        abs_max_deviation,
        rms_error: (ss_res / n).sqrt(),
        mae: deviations.iter().map(|d| d.abs()).sum::<f64>() / n,
        r_squared,
        slope,
        intercept,
    })
}

/// Linearity of `measured` and `compensated` against the same `actual`.
pub fn compensation_effect(
    actual: &[f64],
    measured: &[f64],
    compensated: &[f64],
    full_scale: Option<f64>,
) -> Result<CompensationEffect> {
    let before = calculate_linearity(actual, measured, full_scale)?;
    let after = calculate_linearity(actual, compensated, full_scale)?;
    let improvement = if before.linearity != 0.0 {
        (before.linearity - after.linearity) / before.linearity * 100.0
    } else {
        0.0
    };
    Ok(CompensationEffect {
        before,
        after,
        improvement,
    })
}
