//! Parameter types configuring the compensation pipeline.
//!
//! Every knob is an explicit, fully defaulted value struct passed by value
//! (or reference) into the stage that needs it. Nothing in the numeric code
//! reads a global; process-wide constants live in [`Defaults`], which callers
//! hand to the workflows explicitly.
//!
//! All types deserialize with `#[serde(default)]`, so a JSON config only has
//! to mention the fields it overrides.

use serde::{Deserialize, Serialize};

/// Process-wide constants for a depth sensor family.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Raw pixel value marking an unmeasured pixel.
    pub invalid_value: u16,
    /// Gray offset of the raw-to-millimetre conversion.
    pub depth_offset: f64,
    /// Micrometres per gray level.
    pub depth_scale_factor: f64,
    /// Minimum fraction of valid pixels an ROI must carry.
    pub min_valid_ratio: f64,
    /// Minimum absolute number of valid pixels for a calibration sample.
    pub min_valid_pixels: usize,
    /// Requested spline order; reduced for short calibration sets.
    pub spline_order: usize,
    /// Full-scale range (mm) used to express linearity as a percentage.
    pub full_scale: f64,
    /// Calibration points that must survive a calibration run.
    pub min_calibration_points: usize,
}

impl Defaults {
    pub const STANDARD: Defaults = Defaults {
        invalid_value: 65535,
        depth_offset: 32768.0,
        depth_scale_factor: 1.6,
        min_valid_ratio: 0.10,
        min_valid_pixels: 100,
        spline_order: 3,
        full_scale: 41.0,
        min_calibration_points: 4,
    };

    pub fn depth_conversion(&self) -> DepthConversionConfig {
        DepthConversionConfig {
            offset: self.depth_offset,
            scale_factor: self.depth_scale_factor,
            invalid_value: self.invalid_value,
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Noise filter chain: outlier rejection → median → Gaussian.
///
/// A stage whose parameter is neutral is skipped: `outlier_std_factor` that is
/// not positive and finite, `median_filter_size <= 1`, `gaussian_filter_sigma <= 0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub outlier_std_factor: f64,
    pub median_filter_size: usize,
    pub gaussian_filter_sigma: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            outlier_std_factor: 3.0,
            median_filter_size: 3,
            gaussian_filter_sigma: 1.0,
        }
    }
}

impl FilterConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Pixel rectangle analysed in each image.
///
/// A negative `width`/`height` (conventionally `-1`) extends that axis to the
/// image edge while the other axis keeps its explicit extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: -1,
            height: -1,
        }
    }
}

impl RoiConfig {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_full_image(&self) -> bool {
        self.x <= 0 && self.y <= 0 && self.width < 0 && self.height < 0
    }

    /// Resolve to `(x0, y0, x1, y1)` half-open pixel bounds inside a `w × h` image.
    pub fn bounds(&self, w: usize, h: usize) -> (usize, usize, usize, usize) {
        let x0 = (self.x.max(0) as usize).min(w);
        let y0 = (self.y.max(0) as usize).min(h);
        let x1 = if self.width < 0 {
            w
        } else {
            (x0 + self.width as usize).min(w)
        };
        let y1 = if self.height < 0 {
            h
        } else {
            (y0 + self.height as usize).min(h)
        };
        (x0, y0, x1.max(x0), y1.max(y0))
    }
}

/// Out-of-range handling for the compensation model.
///
/// - `max_low`/`max_high`: how far (mm, measured axis) below/above the
///   calibrated domain linear extrapolation is still applied. The limit is
///   inclusive.
/// - `output_min`/`output_max`: final clamp applied when `clamp_output`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrapolateConfig {
    pub enabled: bool,
    pub max_low: f64,
    pub max_high: f64,
    pub output_min: f64,
    pub output_max: f64,
    pub clamp_output: bool,
}

impl Default for ExtrapolateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_low: 2.0,
            max_high: 2.0,
            output_min: 0.0,
            output_max: 43.0,
            clamp_output: true,
        }
    }
}

impl ExtrapolateConfig {
    /// No extrapolation and no output clamp: plain spline inside the domain,
    /// boundary values outside.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            clamp_output: false,
            ..Self::default()
        }
    }
}

/// Constant offset re-centering the compensated output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub enabled: bool,
    pub target_center: f64,
    pub auto_offset: bool,
    pub manual_offset: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_center: 0.0,
            auto_offset: true,
            manual_offset: 0.0,
        }
    }
}

impl NormalizeConfig {
    /// Offset to add for a model whose actual-axis range is `y_range`.
    pub fn offset_for(&self, y_range: (f64, f64)) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        if self.auto_offset {
            self.target_center - 0.5 * (y_range.0 + y_range.1)
        } else {
            self.manual_offset
        }
    }
}

/// Affine map between raw gray levels and millimetres:
/// `mm = (gray − offset) × scale_factor / 1000`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConversionConfig {
    pub offset: f64,
    pub scale_factor: f64,
    pub invalid_value: u16,
}

impl Default for DepthConversionConfig {
    fn default() -> Self {
        Defaults::STANDARD.depth_conversion()
    }
}

impl DepthConversionConfig {
    #[inline]
    pub fn gray_to_mm(&self, gray: f64) -> f64 {
        (gray - self.offset) * self.scale_factor / 1000.0
    }

    #[inline]
    pub fn mm_to_gray(&self, mm: f64) -> f64 {
        mm * 1000.0 / self.scale_factor + self.offset
    }

    /// Convert back to a storable pixel. Rounds, saturates to `u16`, and never
    /// yields the sentinel so a compensated pixel cannot turn invalid.
    #[inline]
    pub fn mm_to_pixel(&self, mm: f64) -> u16 {
        let gray = self.mm_to_gray(mm);
        let px = if gray.is_nan() {
            0
        } else {
            gray.round().clamp(0.0, u16::MAX as f64) as u16
        };
        if px == self.invalid_value {
            if px == 0 {
                1
            } else {
                px - 1
            }
        } else {
            px
        }
    }

    #[inline]
    pub fn is_invalid(&self, px: u16) -> bool {
        px == self.invalid_value
    }
}
