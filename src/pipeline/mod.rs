//! Workflows built on the numeric core.
//!
//! - [`sampler`]: frame → scalar depth (extract, level, filter, mean).
//! - [`calibration`]: dataset → model, skipping unusable frames.
//! - [`batch`]: directory of frames → compensated frames.
//! - [`evaluate`]: dataset → linearity before/after compensation.
//! - [`slot`]: shared holder for the active model.
//!
//! Every workflow reports progress through a `FnMut(current, total, message)`
//! callback invoked on the calling thread: once with `current = 0` before the
//! first item and once per item.
pub mod batch;
pub mod calibration;
pub mod evaluate;
pub mod sampler;
pub mod slot;

pub use batch::{compensate_directory, compensate_files, BatchProcessResult, ImageRecord};
pub use calibration::{
    calibrate_dataset, calibrate_with, AcceptedSample, CalibrationOutcome, CalibrationSettings,
    SkippedSample,
};
pub use evaluate::{evaluate_dataset, evaluate_with, DatasetLinearity, EvaluatedPoint};
pub use sampler::{measure_depth, DepthReading, SamplerConfig};
pub use slot::ModelSlot;
