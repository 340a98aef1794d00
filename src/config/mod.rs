//! JSON configs for the `depthcomp` subcommands.
//!
//! Every section is optional except the input and output locations; omitted
//! knobs fall back to [`Defaults`]. Relative output file names resolve
//! against the config's `output.dir`.
pub mod calibrate;
pub mod compensate;
pub mod linearity;

use crate::params::{Defaults, DepthConversionConfig, FilterConfig, RoiConfig};
use crate::pipeline::SamplerConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// How a frame is reduced to one depth reading.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    pub roi: RoiConfig,
    pub filter: FilterConfig,
    /// Overrides the conversion derived from the defaults table.
    pub depth: Option<DepthConversionConfig>,
    pub min_valid_ratio: Option<f64>,
    pub min_valid_pixels: Option<usize>,
}

impl MeasurementConfig {
    pub fn resolve(&self, defaults: &Defaults) -> SamplerConfig {
        SamplerConfig {
            roi: self.roi,
            filter: self.filter.clone(),
            depth: self.depth.unwrap_or_else(|| defaults.depth_conversion()),
            min_valid_ratio: self.min_valid_ratio.unwrap_or(defaults.min_valid_ratio),
            min_valid_pixels: self.min_valid_pixels.unwrap_or(defaults.min_valid_pixels),
        }
    }
}

/// `path` if absolute, otherwise `base.join(path)`.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_overrides_fall_back_to_defaults() {
        let cfg: MeasurementConfig = serde_json::from_str(
            r#"{"roi": {"x": 10, "width": 50}, "min_valid_pixels": 20}"#,
        )
        .unwrap();
        let sampler = cfg.resolve(&Defaults::STANDARD);
        assert_eq!(sampler.roi, RoiConfig::new(10, 0, 50, -1));
        assert_eq!(sampler.min_valid_pixels, 20);
        assert_eq!(sampler.min_valid_ratio, 0.10);
        assert_eq!(sampler.depth, Defaults::STANDARD.depth_conversion());
    }

    #[test]
    fn relative_paths_join_base() {
        assert_eq!(
            resolve_path(Path::new("/out"), Path::new("model.json")),
            PathBuf::from("/out/model.json")
        );
        assert_eq!(
            resolve_path(Path::new("/out"), Path::new("/abs/model.json")),
            PathBuf::from("/abs/model.json")
        );
    }
}
