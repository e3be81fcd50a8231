//! Error types for corrflow.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for corrflow operations.
pub type CorrFlowResult<T> = std::result::Result<T, CorrFlowError>;

/// Coarse classification of [`CorrFlowError`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid geometry, mismatched buffer shapes or bad parameter overrides.
    Configuration,
    /// A file could not be read or written.
    Io,
    /// Accelerator allocation or dispatch failure.
    Device,
    /// An engine operation was called out of order.
    State,
}

/// Errors that can occur when running corrflow algorithms.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CorrFlowError {
    /// Width or height is zero, or their product overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The sample vector does not match the requested dimensions.
    #[error("buffer length mismatch: expected {expected} samples, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// The correlation window does not fit the image.
    #[error("invalid window size {window} for a {width}x{height} image")]
    InvalidWindow {
        window: usize,
        width: usize,
        height: usize,
    },
    /// A buffer handed to the engine has the wrong shape.
    #[error("{name} must be {expected_width}x{expected_height}, got {width}x{height}")]
    ShapeMismatch {
        name: &'static str,
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
    /// A parameter override has the wrong kind or an out-of-range value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    /// Reading or writing a file failed.
    #[error("i/o error on {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
    /// The accelerator could not allocate or run work.
    #[error("device error: {0}")]
    Device(String),
    /// An engine operation was called in the wrong state.
    #[error("{operation} is not allowed while the engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl CorrFlowError {
    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDimensions { .. }
            | Self::LengthMismatch { .. }
            | Self::InvalidWindow { .. }
            | Self::ShapeMismatch { .. }
            | Self::InvalidParameter { .. } => ErrorKind::Configuration,
            Self::Io { .. } => ErrorKind::Io,
            Self::Device(_) => ErrorKind::Device,
            Self::InvalidState { .. } => ErrorKind::State,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
