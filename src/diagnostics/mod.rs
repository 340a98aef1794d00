//! Timing traces and the JSON reports emitted by the workflows.
//!
//! `TimingBreakdown` is threaded through the filter chain and the calibration
//! run; the report types in [`report`] bundle workflow outcomes for
//! serialization.

pub mod report;
pub mod timing;

pub use report::{CalibrationReport, CompensationReport, LinearityReport, ModelSummary, SampleEntry};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
