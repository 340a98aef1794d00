//! Invalid-aware noise filter chain applied to a tilt-corrected sample.
//!
//! Stages run in a fixed order: outlier rejection → median → Gaussian.
//! Every stage sees the mask left by the previous one. The neighbourhood
//! filters fill invalid positions with the valid mean before filtering and
//! re-apply the mask afterwards, so invalid pixels never leak into the
//! result and never pull valid neighbours towards zero.
pub mod fill;
pub mod gaussian;
pub mod median;
pub mod outliers;

pub use fill::fill_invalid;
pub use gaussian::{gaussian_filter, gaussian_filter_filled, GaussianKernel, SeparableFilter};
pub use median::{median_filter, median_filter_filled};
pub use outliers::reject_outliers;

use crate::diagnostics::{elapsed_ms, TimingBreakdown};
use crate::extract::DepthSample;
use crate::params::FilterConfig;
use log::debug;
use serde::Serialize;
use std::time::Instant;

/// What the filter chain did to one sample.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FilterReport {
    pub valid_before: usize,
    pub valid_after: usize,
    pub outliers_rejected: usize,
    pub timings: TimingBreakdown,
}

/// Run the configured chain. A disabled config passes the sample through.
pub fn apply_filters(sample: &DepthSample, config: &FilterConfig) -> (DepthSample, FilterReport) {
    let valid_before = sample.valid_count();
    let mut report = FilterReport {
        valid_before,
        valid_after: valid_before,
        ..Default::default()
    };
    if !config.enabled {
        return (sample.clone(), report);
    }

    let total_start = Instant::now();
    let mut current = sample.clone();

    let factor = config.outlier_std_factor;
    if factor.is_finite() && factor > 0.0 {
        let start = Instant::now();
        report.outliers_rejected = reject_outliers(&mut current, factor);
        let ms = elapsed_ms(start);
        debug!(
            "filters: outliers factor={factor} rejected={} ({ms:.3} ms)",
            report.outliers_rejected
        );
        report.timings.push("outliers", ms);
    }

    if config.median_filter_size > 1 {
        let start = Instant::now();
        current = median_filter(&current, config.median_filter_size);
        let ms = elapsed_ms(start);
        debug!(
            "filters: median size={} ({ms:.3} ms)",
            config.median_filter_size
        );
        report.timings.push("median", ms);
    }

    if gaussian::is_active_sigma(config.gaussian_filter_sigma) {
        let start = Instant::now();
        current = gaussian_filter(&current, config.gaussian_filter_sigma);
        let ms = elapsed_ms(start);
        debug!(
            "filters: gaussian sigma={} ({ms:.3} ms)",
            config.gaussian_filter_sigma
        );
        report.timings.push("gaussian", ms);
    }

    report.valid_after = current.valid_count();
    report.timings.total_ms = elapsed_ms(total_start);
    (current, report)
}
