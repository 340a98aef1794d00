//! Spline compensation model.
//!
//! - [`bspline`]: interpolating B-spline (knots, coefficients, degree).
//! - [`model`]: forward/inverse splines built from calibration pairs.
//! - [`compensate`]: range handling, normalization and per-image application.
//! - [`persist`]: JSON save/load.
pub mod bspline;
pub mod compensate;
pub mod model;
pub mod persist;

pub use bspline::BSpline;
pub use compensate::{
    CompensationResult, Compensator, ExtrapolationStats, ImageCompensation, Region,
};
pub use model::{CalibrationPoint, CompensationModel, MODEL_TYPE, MODEL_VERSION};
pub use persist::{from_json, load_model, save_model, to_json, ModelDocument, SaveFormat};
