use super::{load_json, resolve_path, MeasurementConfig};
use crate::params::{Defaults, ExtrapolateConfig, NormalizeConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct LinearityToolConfig {
    /// Test dataset directory with the displacement table and frames.
    pub input: PathBuf,
    /// Optional model; without one only the raw linearity is reported.
    #[serde(default)]
    pub model: Option<PathBuf>,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub measurement: MeasurementConfig,
    #[serde(default)]
    pub full_scale: Option<f64>,
    #[serde(default)]
    pub extrapolate: ExtrapolateConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    pub output: LinearityOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct LinearityOutputConfig {
    pub dir: PathBuf,
    #[serde(default = "default_report_file")]
    pub report: PathBuf,
}

fn default_report_file() -> PathBuf {
    PathBuf::from("linearity_report.json")
}

impl LinearityToolConfig {
    /// Explicit full scale when positive, otherwise the defaults table value.
    pub fn full_scale(&self) -> f64 {
        self.full_scale
            .filter(|fs| *fs > 0.0)
            .unwrap_or(self.defaults.full_scale)
    }

    pub fn report_path(&self) -> PathBuf {
        resolve_path(&self.output.dir, &self.output.report)
    }
}

pub fn load_config(path: &Path) -> Result<LinearityToolConfig, String> {
    load_json(path)
}
