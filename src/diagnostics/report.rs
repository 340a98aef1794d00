//! JSON reports written by the command-line workflows.
use super::timing::TimingBreakdown;
use crate::linearity::{calculate_linearity, LinearityResult};
use crate::pipeline::{BatchProcessResult, CalibrationOutcome, DatasetLinearity, SkippedSample};
use crate::spline::{CalibrationPoint, CompensationModel};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub version: String,
    pub k: usize,
    pub calibration_points: usize,
    pub measured_range: [f64; 2],
    pub actual_range: [f64; 2],
    pub has_forward: bool,
}

impl ModelSummary {
    pub fn of(model: &CompensationModel) -> Self {
        let (x0, x1) = model.x_range();
        let (y0, y1) = model.y_range();
        Self {
            version: model.version().to_string(),
            k: model.k(),
            calibration_points: model.calibration_points(),
            measured_range: [x0, x1],
            actual_range: [y0, y1],
            has_forward: model.forward().is_some(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleEntry {
    pub name: String,
    pub actual: f64,
    pub measured: f64,
    pub valid_pixels: usize,
    pub total_pixels: usize,
    pub flatness: Option<f64>,
    pub outliers_rejected: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReport {
    pub dataset: PathBuf,
    pub total_images: usize,
    pub samples: Vec<SampleEntry>,
    pub skipped: Vec<SkippedSample>,
    pub model: ModelSummary,
    /// Linearity of the raw calibration readings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_linearity: Option<LinearityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    pub timing: TimingBreakdown,
}

impl CalibrationReport {
    pub fn new(
        dataset: &Path,
        outcome: &CalibrationOutcome,
        full_scale: Option<f64>,
        model_path: Option<PathBuf>,
    ) -> Self {
        let points: Vec<CalibrationPoint> = outcome.points();
        let actual: Vec<f64> = points.iter().map(|p| p.actual).collect();
        let measured: Vec<f64> = points.iter().map(|p| p.measured).collect();
        Self {
            dataset: dataset.to_path_buf(),
            total_images: outcome.total_images,
            samples: outcome
                .accepted
                .iter()
                .map(|s| SampleEntry {
                    name: s.name.clone(),
                    actual: s.actual,
                    measured: s.reading.depth_mm,
                    valid_pixels: s.reading.valid_pixels,
                    total_pixels: s.reading.total_pixels,
                    flatness: s.reading.flatness,
                    outliers_rejected: s.reading.filter.outliers_rejected,
                })
                .collect(),
            skipped: outcome.skipped.clone(),
            model: ModelSummary::of(&outcome.model),
            raw_linearity: calculate_linearity(&actual, &measured, full_scale).ok(),
            model_path,
            timing: outcome.timings.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearityReport {
    pub dataset: PathBuf,
    pub num_images: usize,
    pub full_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    pub result: DatasetLinearity,
}

impl LinearityReport {
    pub fn new(
        dataset: &Path,
        full_scale: f64,
        model_path: Option<PathBuf>,
        result: DatasetLinearity,
    ) -> Self {
        Self {
            dataset: dataset.to_path_buf(),
            num_images: result.points.len(),
            full_scale,
            model_path,
            result,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub model: ModelSummary,
    pub normalize_offset: f64,
    pub batch: BatchProcessResult,
}
