//! Applying a calibration model to measured depths.
//!
//! Inside the calibrated measured range the inverse spline is used directly.
//! Below/above it, a linear continuation along the boundary derivative is
//! applied up to `max_low`/`max_high` millimetres (inclusive); farther out the
//! boundary value is returned. The normalization offset is added last and the
//! optional output clamp applied on top.
use super::model::CompensationModel;
use crate::image::DepthImage;
use crate::params::{DepthConversionConfig, ExtrapolateConfig, NormalizeConfig};
use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

/// Where a measured value falls relative to the calibrated domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Region {
    InRange,
    /// Outside the domain but within the extrapolation limits.
    Extrapolated,
    OutOfRange,
}

/// Pixel accounting for one compensated frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CompensationResult {
    pub total_pixels: usize,
    pub valid_pixels: usize,
    pub invalid_pixels: usize,
    pub in_range_pixels: usize,
    pub extrapolated_pixels: usize,
    pub out_of_range_pixels: usize,
    pub compensated_pixels: usize,
    /// `compensated / total × 100`, `0` for an empty frame.
    pub compensation_rate: f64,
    pub extrapolation_enabled: bool,
    pub normalize_offset: f64,
}

/// Compensated frame plus its pixel accounting.
#[derive(Clone, Debug)]
pub struct ImageCompensation {
    pub image: DepthImage,
    pub result: CompensationResult,
}

/// Distribution of a set of measured values around the calibrated domain.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExtrapolationStats {
    pub total: usize,
    pub in_range: usize,
    pub below_range: usize,
    pub above_range: usize,
    /// Largest distance below `x_min`, `0` when nothing is below.
    pub max_below_distance: f64,
    pub max_above_distance: f64,
    /// Values outside the domain but within the extrapolation limits.
    pub extrapolated: usize,
    pub out_of_range: usize,
}

#[derive(Clone, Debug)]
pub struct Compensator {
    model: Arc<CompensationModel>,
    extrapolate: ExtrapolateConfig,
    normalize_offset: f64,
    x_min: f64,
    x_max: f64,
    y_at_min: f64,
    y_at_max: f64,
    slope_low: f64,
    slope_high: f64,
}

impl Compensator {
    pub fn new(
        model: Arc<CompensationModel>,
        extrapolate: ExtrapolateConfig,
        normalize: &NormalizeConfig,
    ) -> Self {
        let (x_min, x_max) = model.x_range();
        let inverse = model.inverse();
        let derivative = inverse.derivative_spline();
        let normalize_offset = normalize.offset_for(model.y_range());
        let comp = Self {
            y_at_min: inverse.evaluate(x_min),
            y_at_max: inverse.evaluate(x_max),
            slope_low: derivative.evaluate(x_min),
            slope_high: derivative.evaluate(x_max),
            x_min,
            x_max,
            normalize_offset,
            extrapolate,
            model,
        };
        debug!(
            "compensator: domain=[{:.4}, {:.4}] slopes=({:.5}, {:.5}) offset={:.4}",
            comp.x_min, comp.x_max, comp.slope_low, comp.slope_high, comp.normalize_offset
        );
        comp
    }

    pub fn model(&self) -> &Arc<CompensationModel> {
        &self.model
    }

    pub fn extrapolate_config(&self) -> &ExtrapolateConfig {
        &self.extrapolate
    }

    pub fn normalize_offset(&self) -> f64 {
        self.normalize_offset
    }

    /// Measured-axis interval that receives a compensated value
    /// (domain widened by the extrapolation limits when enabled).
    pub fn extended_range(&self) -> (f64, f64) {
        if self.extrapolate.enabled {
            (
                self.x_min - self.extrapolate.max_low,
                self.x_max + self.extrapolate.max_high,
            )
        } else {
            (self.x_min, self.x_max)
        }
    }

    pub fn classify(&self, measured: f64) -> Region {
        if measured >= self.x_min && measured <= self.x_max {
            return Region::InRange;
        }
        if !self.extrapolate.enabled || measured.is_nan() {
            return Region::OutOfRange;
        }
        let within = if measured < self.x_min {
            self.x_min - measured <= self.extrapolate.max_low
        } else {
            measured - self.x_max <= self.extrapolate.max_high
        };
        if within {
            Region::Extrapolated
        } else {
            Region::OutOfRange
        }
    }

    /// Compensated actual depth for one measured depth (mm). NaN propagates.
    pub fn compensate(&self, measured: f64) -> f64 {
        let ex = &self.extrapolate;
        let raw = if measured < self.x_min {
            let d = self.x_min - measured;
            if ex.enabled && d <= ex.max_low {
                self.y_at_min - self.slope_low * d
            } else {
                self.y_at_min
            }
        } else if measured > self.x_max {
            let d = measured - self.x_max;
            if ex.enabled && d <= ex.max_high {
                self.y_at_max + self.slope_high * d
            } else {
                self.y_at_max
            }
        } else {
            self.model.predict_actual(measured)
        };
        let out = raw + self.normalize_offset;
        if ex.clamp_output && !out.is_nan() {
            out.max(ex.output_min).min(ex.output_max)
        } else {
            out
        }
    }

    /// Same rules as [`compensate`](Self::compensate), one call per slice.
    pub fn compensate_batch(&self, measured: &[f64]) -> Vec<f64> {
        #[cfg(feature = "parallel")]
        {
            measured.par_iter().map(|&m| self.compensate(m)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            measured.iter().map(|&m| self.compensate(m)).collect()
        }
    }

    /// Compensate every measured pixel of a raw frame.
    ///
    /// Sentinel pixels pass through. Pixels outside the extended range keep
    /// their raw value and are counted as out of range.
    pub fn compensate_image(
        &self,
        image: &DepthImage,
        depth: &DepthConversionConfig,
    ) -> ImageCompensation {
        let map_pixel = |&px: &u16| -> (u16, Option<Region>) {
            if depth.is_invalid(px) {
                return (px, None);
            }
            let mm = depth.gray_to_mm(px as f64);
            match self.classify(mm) {
                Region::OutOfRange => (px, Some(Region::OutOfRange)),
                region => (depth.mm_to_pixel(self.compensate(mm)), Some(region)),
            }
        };

        #[cfg(feature = "parallel")]
        let mapped: Vec<(u16, Option<Region>)> = image.data.par_iter().map(map_pixel).collect();
        #[cfg(not(feature = "parallel"))]
        let mapped: Vec<(u16, Option<Region>)> = image.data.iter().map(map_pixel).collect();

        let mut result = CompensationResult {
            total_pixels: mapped.len(),
            extrapolation_enabled: self.extrapolate.enabled,
            normalize_offset: self.normalize_offset,
            ..Default::default()
        };
        let mut data = Vec::with_capacity(mapped.len());
        for (px, region) in mapped {
            data.push(px);
            match region {
                None => result.invalid_pixels += 1,
                Some(Region::InRange) => result.in_range_pixels += 1,
                Some(Region::Extrapolated) => result.extrapolated_pixels += 1,
                Some(Region::OutOfRange) => result.out_of_range_pixels += 1,
            }
        }
        result.valid_pixels = result.total_pixels - result.invalid_pixels;
        result.compensated_pixels = result.in_range_pixels + result.extrapolated_pixels;
        result.compensation_rate = if result.total_pixels == 0 {
            0.0
        } else {
            result.compensated_pixels as f64 / result.total_pixels as f64 * 100.0
        };
        debug!(
            "compensate_image {}x{}: in={} extra={} out={} invalid={} rate={:.2}%",
            image.w,
            image.h,
            result.in_range_pixels,
            result.extrapolated_pixels,
            result.out_of_range_pixels,
            result.invalid_pixels,
            result.compensation_rate
        );

        ImageCompensation {
            image: DepthImage {
                w: image.w,
                h: image.h,
                data,
            },
            result,
        }
    }

    pub fn extrapolation_stats(&self, measured: &[f64]) -> ExtrapolationStats {
        let mut stats = ExtrapolationStats {
            total: measured.len(),
            ..Default::default()
        };
        for &m in measured {
            if m < self.x_min {
                stats.below_range += 1;
                stats.max_below_distance = stats.max_below_distance.max(self.x_min - m);
            } else if m > self.x_max {
                stats.above_range += 1;
                stats.max_above_distance = stats.max_above_distance.max(m - self.x_max);
            } else if m.is_finite() {
                stats.in_range += 1;
            }
            match self.classify(m) {
                Region::Extrapolated => stats.extrapolated += 1,
                Region::OutOfRange => stats.out_of_range += 1,
                Region::InRange => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTUAL: [f64; 5] = [0.0, 5.0, 10.0, 15.0, 20.0];
    const MEASURED: [f64; 5] = [0.05, 5.02, 10.01, 15.03, 19.98];

    fn model() -> Arc<CompensationModel> {
        Arc::new(CompensationModel::build(&ACTUAL, &MEASURED, 3).unwrap())
    }

    fn plain() -> Compensator {
        Compensator::new(model(), ExtrapolateConfig::disabled(), &NormalizeConfig::default())
    }

    #[test]
    fn compensates_calibration_points() {
        let comp = plain();
        assert!((comp.compensate(10.01) - 10.0).abs() < 0.01);
        for (a, m) in ACTUAL.iter().zip(&MEASURED) {
            assert!((comp.compensate(*m) - a).abs() < 1e-6);
        }
    }

    #[test]
    fn nan_input_stays_nan_through_clamp() {
        let comp = Compensator::new(
            model(),
            ExtrapolateConfig::default(),
            &NormalizeConfig::default(),
        );
        assert!(comp.extrapolate_config().clamp_output);
        assert!(comp.compensate(f64::NAN).is_nan());
        assert!(comp.compensate_batch(&[f64::NAN, 10.01])[0].is_nan());
    }

    #[test]
    fn extrapolation_is_linear_up_to_inclusive_limit() {
        let extra = ExtrapolateConfig {
            clamp_output: false,
            ..Default::default()
        };
        let comp = Compensator::new(model(), extra, &NormalizeConfig::default());
        let slope = comp.model().inverse().derivative(19.98);
        let at_limit = comp.compensate(19.98 + 2.0);
        assert!((at_limit - (20.0 + 2.0 * slope)).abs() < 1e-9);
        assert_eq!(comp.classify(19.98 + 2.0), Region::Extrapolated);

        let low_slope = comp.model().inverse().derivative(0.05);
        let below = comp.compensate(0.05 - 1.0);
        assert!((below - (0.0 - low_slope)).abs() < 1e-9);
    }

    #[test]
    fn beyond_limit_returns_boundary_value() {
        let extra = ExtrapolateConfig {
            clamp_output: false,
            ..Default::default()
        };
        let comp = Compensator::new(model(), extra, &NormalizeConfig::default());
        for d in [2.5, 10.0, 1.0e6] {
            assert!((comp.compensate(19.98 + d) - 20.0).abs() < 1e-9);
            assert!(comp.compensate(0.05 - d).abs() < 1e-9);
            assert_eq!(comp.classify(19.98 + d), Region::OutOfRange);
        }
    }

    #[test]
    fn disabled_extrapolation_holds_boundary() {
        let comp = plain();
        assert!((comp.compensate(21.0) - 20.0).abs() < 1e-9);
        assert_eq!(comp.classify(21.0), Region::OutOfRange);
        assert_eq!(comp.extended_range(), (0.05, 19.98));
    }

    #[test]
    fn normalization_and_clamp_apply_last() {
        let normalize = NormalizeConfig {
            enabled: true,
            target_center: 0.0,
            auto_offset: true,
            manual_offset: 0.0,
        };
        let comp = Compensator::new(model(), ExtrapolateConfig::disabled(), &normalize);
        assert!((comp.normalize_offset() + 10.0).abs() < 1e-12);
        assert!((comp.compensate(10.01) - 0.0).abs() < 0.01);

        let clamped = Compensator::new(model(), ExtrapolateConfig::default(), &normalize);
        // Output clamp [0, 43] applies after the offset.
        assert_eq!(clamped.compensate(0.05), 0.0);
    }

    #[test]
    fn batch_matches_scalar() {
        let comp = Compensator::new(
            model(),
            ExtrapolateConfig::default(),
            &NormalizeConfig::default(),
        );
        let inputs: Vec<f64> = (0..300).map(|i| -5.0 + i as f64 * 0.1).collect();
        let batch = comp.compensate_batch(&inputs);
        for (m, b) in inputs.iter().zip(&batch) {
            assert_eq!(comp.compensate(*m), *b);
        }
    }

    #[test]
    fn image_compensation_counts_regions() {
        let depth = DepthConversionConfig::default();
        let comp = Compensator::new(
            model(),
            ExtrapolateConfig::default(),
            &NormalizeConfig::default(),
        );
        let data = vec![
            depth.mm_to_pixel(10.01),
            depth.mm_to_pixel(21.0),
            depth.mm_to_pixel(30.0),
            depth.invalid_value,
        ];
        let raw_far = data[2];
        let image = DepthImage::from_raw(2, 2, data).unwrap();
        let out = comp.compensate_image(&image, &depth);
        let r = &out.result;
        assert_eq!(r.total_pixels, 4);
        assert_eq!(r.invalid_pixels, 1);
        assert_eq!(r.in_range_pixels, 1);
        assert_eq!(r.extrapolated_pixels, 1);
        assert_eq!(r.out_of_range_pixels, 1);
        assert_eq!(r.compensated_pixels, 2);
        assert!((r.compensation_rate - 50.0).abs() < 1e-12);
        assert_eq!(out.image.data[2], raw_far);
        assert_eq!(out.image.data[3], depth.invalid_value);
        let back = depth.gray_to_mm(out.image.data[0] as f64);
        assert!((back - 10.0).abs() < 0.01);
    }

    #[test]
    fn empty_image_has_zero_rate() {
        let comp = plain();
        let out = comp.compensate_image(
            &DepthImage::filled(0, 0, 0),
            &DepthConversionConfig::default(),
        );
        assert_eq!(out.result.compensation_rate, 0.0);
    }

    #[test]
    fn stats_split_values_around_domain() {
        let comp = Compensator::new(
            model(),
            ExtrapolateConfig::default(),
            &NormalizeConfig::default(),
        );
        let stats = comp.extrapolation_stats(&[-3.0, -1.0, 5.0, 21.0, 25.0]);
        assert_eq!(stats.in_range, 1);
        assert_eq!(stats.below_range, 2);
        assert_eq!(stats.above_range, 2);
        assert_eq!(stats.extrapolated, 2);
        assert_eq!(stats.out_of_range, 2);
        assert!((stats.max_below_distance - 3.05).abs() < 1e-12);
        assert!((stats.max_above_distance - 5.02).abs() < 1e-12);
    }
}
