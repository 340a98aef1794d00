//! Linearity of a test dataset, before and (with a model) after compensation.
use super::calibration::SkippedSample;
use super::sampler::{measure_depth, SamplerConfig};
use crate::dataset::{frame_name, Dataset};
use crate::error::{CompensationError, Result};
use crate::image::io::load_depth_image;
use crate::image::DepthImage;
use crate::linearity::{calculate_linearity, compensation_effect, LinearityResult};
use crate::spline::Compensator;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize)]
pub struct EvaluatedPoint {
    pub name: String,
    pub actual: f64,
    pub measured: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensated: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DatasetLinearity {
    pub full_scale: Option<f64>,
    pub points: Vec<EvaluatedPoint>,
    pub skipped: Vec<SkippedSample>,
    pub before: LinearityResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<LinearityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement: Option<f64>,
}

pub fn evaluate_dataset<P>(
    dataset: &Dataset,
    sampler: &SamplerConfig,
    compensator: Option<&Compensator>,
    full_scale: Option<f64>,
    progress: P,
) -> Result<DatasetLinearity>
where
    P: FnMut(usize, usize, &str),
{
    evaluate_with(
        &dataset.entries(),
        load_depth_image,
        sampler,
        compensator,
        full_scale,
        progress,
    )
}

/// Frames that cannot be measured are skipped like in a calibration run; at
/// least two must remain.
pub fn evaluate_with<L, P>(
    entries: &[(PathBuf, f64)],
    mut load: L,
    sampler: &SamplerConfig,
    compensator: Option<&Compensator>,
    full_scale: Option<f64>,
    mut progress: P,
) -> Result<DatasetLinearity>
where
    L: FnMut(&Path) -> Result<DepthImage>,
    P: FnMut(usize, usize, &str),
{
    let total = entries.len();
    let mut points = Vec::new();
    let mut skipped = Vec::new();

    progress(0, total, &format!("processing {total} images"));
    for (i, (path, actual)) in entries.iter().enumerate() {
        let name = frame_name(path);
        progress(i + 1, total, &name);
        match load(path).and_then(|img| measure_depth(&img, sampler)) {
            Ok(reading) => points.push(EvaluatedPoint {
                name,
                actual: *actual,
                measured: reading.depth_mm,
                compensated: compensator.map(|c| c.compensate(reading.depth_mm)),
            }),
            Err(err) if err.is_recoverable_sample_error() => {
                warn!("linearity: skipping {name}: {err}");
                skipped.push(SkippedSample {
                    name,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
    if points.len() < 2 {
        return Err(CompensationError::InsufficientData {
            needed: 2,
            got: points.len(),
        });
    }

    let actual: Vec<f64> = points.iter().map(|p| p.actual).collect();
    let measured: Vec<f64> = points.iter().map(|p| p.measured).collect();
    let compensated: Option<Vec<f64>> = points.iter().map(|p| p.compensated).collect();

    let (before, after, improvement) = match compensated {
        Some(comp) => {
            let effect = compensation_effect(&actual, &measured, &comp, full_scale)?;
            (effect.before, Some(effect.after), Some(effect.improvement))
        }
        None => (calculate_linearity(&actual, &measured, full_scale)?, None, None),
    };
    info!(
        "linearity: {} points, before={:.4}%{}",
        points.len(),
        before.linearity,
        after
            .map(|a| format!(" after={:.4}%", a.linearity))
            .unwrap_or_default()
    );

    Ok(DatasetLinearity {
        full_scale,
        points,
        skipped,
        before,
        after,
        improvement,
    })
}
