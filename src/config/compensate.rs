use super::{load_json, resolve_path};
use crate::params::{Defaults, DepthConversionConfig, ExtrapolateConfig, NormalizeConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct CompensateToolConfig {
    /// Directory of raw frames.
    pub input: PathBuf,
    /// Model JSON written by `calibrate`.
    pub model: PathBuf,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub depth: Option<DepthConversionConfig>,
    #[serde(default)]
    pub extrapolate: ExtrapolateConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    pub output: CompensateOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct CompensateOutputConfig {
    /// Compensated frames are written here under their input file names.
    pub dir: PathBuf,
    #[serde(default)]
    pub report: Option<PathBuf>,
}

impl CompensateToolConfig {
    pub fn depth(&self) -> DepthConversionConfig {
        self.depth
            .unwrap_or_else(|| self.defaults.depth_conversion())
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        self.output
            .report
            .as_deref()
            .map(|p| resolve_path(&self.output.dir, p))
    }
}

pub fn load_config(path: &Path) -> Result<CompensateToolConfig, String> {
    load_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_extrapolation_override() {
        let cfg: CompensateToolConfig = serde_json::from_str(
            r#"{
                "input": "raw",
                "model": "out/compensation_model.json",
                "extrapolate": {"enabled": false},
                "output": {"dir": "compensated", "report": "batch.json"}
            }"#,
        )
        .unwrap();
        assert!(!cfg.extrapolate.enabled);
        assert_eq!(cfg.extrapolate.max_high, 2.0);
        assert!(!cfg.normalize.enabled);
        assert_eq!(cfg.depth().invalid_value, 65535);
        assert_eq!(cfg.report_path(), Some(PathBuf::from("compensated/batch.json")));
    }
}
