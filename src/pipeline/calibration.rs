//! Calibration run: frames with known displacement → compensation model.
use super::sampler::{measure_depth, DepthReading, SamplerConfig};
use crate::dataset::{frame_name, Dataset};
use crate::diagnostics::{elapsed_ms, TimingBreakdown};
use crate::error::{CompensationError, Result};
use crate::image::io::load_depth_image;
use crate::image::DepthImage;
use crate::params::Defaults;
use crate::spline::{CalibrationPoint, CompensationModel};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    pub sampler: SamplerConfig,
    pub spline_order: usize,
    pub min_calibration_points: usize,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self::with_defaults(&Defaults::STANDARD)
    }
}

impl CalibrationSettings {
    pub fn with_defaults(defaults: &Defaults) -> Self {
        Self {
            sampler: SamplerConfig::with_defaults(defaults),
            spline_order: defaults.spline_order,
            min_calibration_points: defaults.min_calibration_points,
        }
    }
}

/// A frame left out of the calibration set and why.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedSample {
    pub name: String,
    pub reason: String,
}

/// A frame that made it into the calibration set.
#[derive(Clone, Debug, Serialize)]
pub struct AcceptedSample {
    pub name: String,
    pub actual: f64,
    pub reading: DepthReading,
}

#[derive(Clone, Debug)]
pub struct CalibrationOutcome {
    pub model: CompensationModel,
    pub accepted: Vec<AcceptedSample>,
    pub skipped: Vec<SkippedSample>,
    pub total_images: usize,
    pub timings: TimingBreakdown,
}

impl CalibrationOutcome {
    pub fn points(&self) -> Vec<CalibrationPoint> {
        self.accepted
            .iter()
            .map(|s| CalibrationPoint {
                actual: s.actual,
                measured: s.reading.depth_mm,
            })
            .collect()
    }
}

/// Calibrate from a discovered dataset, reading frames from disk.
pub fn calibrate_dataset<P>(
    dataset: &Dataset,
    settings: &CalibrationSettings,
    progress: P,
) -> Result<CalibrationOutcome>
where
    P: FnMut(usize, usize, &str),
{
    calibrate_with(&dataset.entries(), load_depth_image, settings, progress)
}

/// Calibrate from `(frame path, actual displacement)` entries.
///
/// Frames that fail for sample-level reasons (too few valid pixels, a
/// degenerate fit, an undecodable file) are skipped and recorded; any other
/// error aborts the run. The run fails when fewer than
/// `min_calibration_points` frames survive.
pub fn calibrate_with<L, P>(
    entries: &[(PathBuf, f64)],
    mut load: L,
    settings: &CalibrationSettings,
    mut progress: P,
) -> Result<CalibrationOutcome>
where
    L: FnMut(&Path) -> Result<DepthImage>,
    P: FnMut(usize, usize, &str),
{
    let total_start = Instant::now();
    let total = entries.len();
    let mut timings = TimingBreakdown::default();
    let mut accepted = Vec::new();
    let mut skipped = Vec::new();

    progress(0, total, &format!("processing {total} calibration images"));
    for (i, (path, actual)) in entries.iter().enumerate() {
        let name = frame_name(path);
        progress(i + 1, total, &name);

        let start = Instant::now();
        let reading = load(path).and_then(|img| measure_depth(&img, &settings.sampler));
        timings.push(name.clone(), elapsed_ms(start));
        match reading {
            Ok(reading) => accepted.push(AcceptedSample {
                name,
                actual: *actual,
                reading,
            }),
            Err(err) if err.is_recoverable_sample_error() => {
                warn!("calibration: skipping {name}: {err}");
                skipped.push(SkippedSample {
                    name,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    let needed = settings.min_calibration_points.max(2);
    if accepted.len() < needed {
        return Err(CompensationError::InsufficientData {
            needed,
            got: accepted.len(),
        });
    }

    let actual: Vec<f64> = accepted.iter().map(|s| s.actual).collect();
    let measured: Vec<f64> = accepted.iter().map(|s| s.reading.depth_mm).collect();
    let model = timings.measure("model_fit", || {
        CompensationModel::build(&actual, &measured, settings.spline_order)
    })?;
    timings.total_ms = elapsed_ms(total_start);
    info!(
        "calibration: {} of {} images used, {} skipped, k={}",
        accepted.len(),
        total,
        skipped.len(),
        model.k()
    );

    Ok(CalibrationOutcome {
        model,
        accepted,
        skipped,
        total_images: total,
        timings,
    })
}
