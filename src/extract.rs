//! Depth sample extraction from a raw frame.
//!
//! Crops the configured ROI, converts every measured pixel to millimetres and
//! records a validity mask that excludes the sentinel value. A frame whose ROI
//! carries too few measured pixels is rejected here, before any fitting, so a
//! calibration run can skip it instead of polluting the calibration set.
use crate::error::{CompensationError, Result};
use crate::image::{DepthImage, ImageF64};
use crate::params::{DepthConversionConfig, RoiConfig};
use log::debug;

/// Depth readings (mm) of one ROI plus a parallel validity mask.
///
/// Invalid entries hold `0.0` and must never be read as data.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthSample {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
    pub valid: Vec<bool>,
}

impl DepthSample {
    /// Build a sample from millimetre values; `None` entries are invalid.
    pub fn from_options(width: usize, height: usize, values: &[Option<f64>]) -> Self {
        assert_eq!(values.len(), width * height, "sample size must equal w * h");
        Self {
            width,
            height,
            values: values.iter().map(|v| v.unwrap_or(0.0)).collect(),
            valid: values.iter().map(Option::is_some).collect(),
        }
    }

    /// Convert a raw frame (already cropped) into millimetres.
    pub fn from_image(image: &DepthImage, depth: &DepthConversionConfig) -> Self {
        let mut values = Vec::with_capacity(image.data.len());
        let mut valid = Vec::with_capacity(image.data.len());
        for &px in &image.data {
            if depth.is_invalid(px) {
                values.push(0.0);
                valid.push(false);
            } else {
                values.push(depth.gray_to_mm(px as f64));
                valid.push(true);
            }
        }
        Self {
            width: image.w,
            height: image.h,
            values,
            valid,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Fraction of valid entries; `0.0` for an empty sample.
    pub fn valid_ratio(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.valid_count() as f64 / self.len() as f64
        }
    }

    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values
            .iter()
            .zip(&self.valid)
            .filter_map(|(&v, &ok)| ok.then_some(v))
    }

    /// Valid pixels as `(x, y, value)`.
    pub fn valid_pixels(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let w = self.width.max(1);
        self.values
            .iter()
            .zip(&self.valid)
            .enumerate()
            .filter_map(move |(i, (&v, &ok))| ok.then_some((i % w, i / w, v)))
    }

    /// Mean of the valid values, `None` when nothing is valid.
    pub fn mean(&self) -> Option<f64> {
        let (sum, n) = self
            .valid_values()
            .fold((0.0f64, 0usize), |(s, n), v| (s + v, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// Values as a dense grid (invalid entries included as stored).
    pub fn to_grid(&self) -> ImageF64 {
        ImageF64::from_vec(self.width, self.height, self.values.clone())
    }
}

/// Crop the ROI out of a frame. A full-frame ROI returns the frame unchanged.
pub fn crop_roi(image: &DepthImage, roi: &RoiConfig) -> DepthImage {
    if roi.is_full_image() {
        return image.clone();
    }
    let (x0, y0, x1, y1) = roi.bounds(image.w, image.h);
    image.crop(x0, y0, x1, y1)
}

/// Crop, convert and validate one ROI.
///
/// Fails with [`CompensationError::InsufficientValidData`] when the share of
/// valid pixels is below `min_valid_ratio`. An empty ROI always fails.
pub fn extract_sample(
    image: &DepthImage,
    roi: &RoiConfig,
    depth: &DepthConversionConfig,
    min_valid_ratio: f64,
) -> Result<DepthSample> {
    let cropped = crop_roi(image, roi);
    let sample = DepthSample::from_image(&cropped, depth);
    let valid = sample.valid_count();
    let total = sample.len();
    let ratio = sample.valid_ratio();
    debug!(
        "extract_sample roi={}x{} valid={}/{} ratio={:.4}",
        sample.width, sample.height, valid, total, ratio
    );
    if total == 0 || ratio < min_valid_ratio {
        return Err(CompensationError::InsufficientValidData {
            valid,
            total,
            ratio,
            required: min_valid_ratio,
        });
    }
    Ok(sample)
}
