//! One frame → one depth reading.
//!
//! extract (ROI, mm, mask) → plane fit and tilt removal → noise filters →
//! mean of the remaining valid pixels.
use crate::error::{CompensationError, Result};
use crate::extract::extract_sample;
use crate::filters::{apply_filters, FilterReport};
use crate::image::DepthImage;
use crate::params::{Defaults, DepthConversionConfig, FilterConfig, RoiConfig};
use crate::plane::{fit_plane, flatness, remove_tilt, PlaneFit};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub roi: RoiConfig,
    pub filter: FilterConfig,
    pub depth: DepthConversionConfig,
    pub min_valid_ratio: f64,
    pub min_valid_pixels: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::with_defaults(&Defaults::STANDARD)
    }
}

impl SamplerConfig {
    pub fn with_defaults(defaults: &Defaults) -> Self {
        Self {
            roi: RoiConfig::default(),
            filter: FilterConfig::default(),
            depth: defaults.depth_conversion(),
            min_valid_ratio: defaults.min_valid_ratio,
            min_valid_pixels: defaults.min_valid_pixels,
        }
    }
}

/// Scalar depth of one frame plus what it took to get there.
#[derive(Clone, Debug, Serialize)]
pub struct DepthReading {
    pub depth_mm: f64,
    pub valid_pixels: usize,
    pub total_pixels: usize,
    pub plane: PlaneFit,
    /// Peak-to-valley of the ROI against the fitted plane, before filtering.
    pub flatness: Option<f64>,
    pub filter: FilterReport,
}

pub fn measure_depth(image: &DepthImage, config: &SamplerConfig) -> Result<DepthReading> {
    let sample = extract_sample(image, &config.roi, &config.depth, config.min_valid_ratio)?;
    let valid = sample.valid_count();
    let total = sample.len();
    if valid < config.min_valid_pixels {
        return Err(CompensationError::InsufficientValidData {
            valid,
            total,
            ratio: sample.valid_ratio(),
            required: config.min_valid_pixels as f64 / total.max(1) as f64,
        });
    }

    let plane = fit_plane(&sample)?;
    let flatness = flatness(&sample, &plane);
    let leveled = remove_tilt(&sample, &plane);
    let (filtered, filter) = apply_filters(&leveled, &config.filter);

    let depth_mm = filtered.mean().ok_or_else(|| {
        CompensationError::InvalidData("no valid pixels left after filtering".into())
    })?;
    debug!(
        "measure_depth: depth={depth_mm:.4} mm plane=({:.5}, {:.5}, {:.4}) valid={}/{}",
        plane.a, plane.b, plane.c, filter.valid_after, total
    );
    Ok(DepthReading {
        depth_mm,
        valid_pixels: valid,
        total_pixels: total,
        plane,
        flatness,
        filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tilted_frame(depth_mm: f64, w: usize, h: usize) -> DepthImage {
        let cfg = DepthConversionConfig::default();
        let mut img = DepthImage::filled(w, h, 0);
        for y in 0..h {
            for x in 0..w {
                let mm = depth_mm + 0.01 * (x as f64 - w as f64 / 2.0)
                    - 0.02 * (y as f64 - h as f64 / 2.0);
                img.set(x, y, cfg.mm_to_pixel(mm));
            }
        }
        img
    }

    #[test]
    fn tilted_frame_reads_plane_level() {
        let img = tilted_frame(12.0, 40, 30);
        let reading = measure_depth(&img, &SamplerConfig::default()).unwrap();
        // Plane level at the ROI origin: 12 - 0.01*20 + 0.02*15.
        assert!((reading.depth_mm - 12.1).abs() < 2e-3, "{}", reading.depth_mm);
        assert!((reading.plane.a - 0.01).abs() < 1e-4);
        assert!((reading.plane.b + 0.02).abs() < 1e-4);
        assert_eq!(reading.valid_pixels, 1200);
    }

    #[test]
    fn too_few_valid_pixels_is_rejected() {
        let mut img = tilted_frame(5.0, 12, 10);
        let cfg = SamplerConfig::default();
        for px in img.data.iter_mut().skip(90) {
            *px = cfg.depth.invalid_value;
        }
        let err = measure_depth(&img, &cfg).unwrap_err();
        assert!(matches!(err, CompensationError::InsufficientValidData { valid: 90, .. }));
        assert!(err.is_recoverable_sample_error());
    }

    #[test]
    fn single_row_roi_reads_row_level() {
        let img = tilted_frame(12.0, 400, 50);
        let cfg = SamplerConfig {
            roi: RoiConfig::new(0, 20, -1, 1),
            ..SamplerConfig::default()
        };
        let reading = measure_depth(&img, &cfg).unwrap();
        // Row 20 starts at 12 - 0.01*200 - 0.02*(20 - 25).
        assert!((reading.depth_mm - 10.1).abs() < 2e-3, "{}", reading.depth_mm);
        assert!((reading.plane.a - 0.01).abs() < 1e-4);
        assert!(reading.plane.b.abs() < 1e-9);
        assert_eq!(reading.total_pixels, 400);
    }
}
