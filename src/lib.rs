#![doc = include_str!("../README.md")]

// Numeric core
pub mod extract;
pub mod filters;
pub mod linearity;
pub mod plane;
pub mod spline;

// Shared value types, grids and errors
pub mod error;
pub mod image;
pub mod params;

// Workflows, on-disk layout and tool plumbing
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod pipeline;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{CompensationError, Result};
pub use crate::extract::{extract_sample, DepthSample};
pub use crate::linearity::{calculate_linearity, compensation_effect, LinearityResult};
pub use crate::params::{
    Defaults, DepthConversionConfig, ExtrapolateConfig, FilterConfig, NormalizeConfig, RoiConfig,
};
pub use crate::spline::{CompensationModel, Compensator};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```
/// use depth_compensation::prelude::*;
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let actual = [0.0, 5.0, 10.0, 15.0, 20.0];
/// let measured = [0.05, 5.02, 10.01, 15.03, 19.98];
///
/// let model = Arc::new(CompensationModel::build(&actual, &measured, 3)?);
/// let comp = Compensator::new(model, ExtrapolateConfig::default(), &NormalizeConfig::default());
///
/// let corrected = comp.compensate(10.01);
/// assert!((corrected - 10.0).abs() < 0.01);
///
/// let lin = calculate_linearity(&actual, &measured, None)?;
/// println!("linearity={:.4}% r2={:.6}", lin.linearity, lin.r_squared);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{DepthImage, ImageView};
    pub use crate::pipeline::{measure_depth, SamplerConfig};
    pub use crate::{
        calculate_linearity, CompensationError, CompensationModel, Compensator, Defaults,
        DepthConversionConfig, ExtrapolateConfig, FilterConfig, NormalizeConfig, Result,
        RoiConfig,
    };
}
