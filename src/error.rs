//! Error taxonomy shared by every stage of the compensation pipeline.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompensationError {
    #[error("{what} not found: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },
    #[error(
        "insufficient valid pixels: {valid}/{total} ({:.2}%) below required {:.2}%",
        .ratio * 100.0,
        .required * 100.0
    )]
    InsufficientValidData {
        valid: usize,
        total: usize,
        ratio: f64,
        required: f64,
    },
    #[error("insufficient calibration data: need at least {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("no compensation model loaded")]
    ModelNotLoaded,
    #[error("image codec error: {0}")]
    Image(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CompensationError {
    pub(crate) fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }

    /// Whether a calibration run may drop the offending sample and continue.
    pub fn is_recoverable_sample_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientValidData { .. } | Self::InvalidData(_) | Self::Image(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CompensationError>;
