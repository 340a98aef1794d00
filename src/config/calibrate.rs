use super::{load_json, resolve_path, MeasurementConfig};
use crate::params::Defaults;
use crate::pipeline::CalibrationSettings;
use crate::spline::SaveFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct CalibrateToolConfig {
    /// Dataset directory with the displacement table and frames.
    pub input: PathBuf,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub measurement: MeasurementConfig,
    #[serde(default)]
    pub spline_order: Option<usize>,
    #[serde(default)]
    pub model_format: SaveFormat,
    pub output: CalibrateOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct CalibrateOutputConfig {
    pub dir: PathBuf,
    #[serde(default = "default_model_file")]
    pub model: PathBuf,
    #[serde(default)]
    pub report: Option<PathBuf>,
}

fn default_model_file() -> PathBuf {
    PathBuf::from("compensation_model.json")
}

impl CalibrateToolConfig {
    pub fn settings(&self) -> CalibrationSettings {
        CalibrationSettings {
            sampler: self.measurement.resolve(&self.defaults),
            spline_order: self.spline_order.unwrap_or(self.defaults.spline_order),
            min_calibration_points: self.defaults.min_calibration_points,
        }
    }

    pub fn model_path(&self) -> PathBuf {
        resolve_path(&self.output.dir, &self.output.model)
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        self.output
            .report
            .as_deref()
            .map(|p| resolve_path(&self.output.dir, p))
    }
}

pub fn load_config(path: &Path) -> Result<CalibrateToolConfig, String> {
    load_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: CalibrateToolConfig =
            serde_json::from_str(r#"{"input": "calib", "output": {"dir": "out"}}"#).unwrap();
        let settings = cfg.settings();
        assert_eq!(settings.spline_order, 3);
        assert_eq!(settings.min_calibration_points, 4);
        assert_eq!(cfg.model_path(), PathBuf::from("out/compensation_model.json"));
        assert!(cfg.report_path().is_none());
        assert_eq!(cfg.model_format, SaveFormat::Minimal);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg: CalibrateToolConfig = serde_json::from_str(
            r#"{
                "input": "calib",
                "defaults": {"min_calibration_points": 6},
                "measurement": {"filter": {"enabled": false}},
                "spline_order": 2,
                "model_format": "full",
                "output": {"dir": "out", "model": "m.json", "report": "report.json"}
            }"#,
        )
        .unwrap();
        let settings = cfg.settings();
        assert_eq!(settings.spline_order, 2);
        assert_eq!(settings.min_calibration_points, 6);
        assert!(!settings.sampler.filter.enabled);
        assert_eq!(cfg.model_format, SaveFormat::Full);
        assert_eq!(cfg.report_path(), Some(PathBuf::from("out/report.json")));
    }
}
