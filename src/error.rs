//! Error types.
//!
//! Using a buffer or plan after dispose is a lifetime bug in the caller and panics
//! instead of producing one of these.

use crate::flags::TransformFamily;
use thiserror::Error;

/// Errors surfaced by buffer and plan operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FftError {
    /// The native allocator returned null.
    #[error("native allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },

    /// Managed data does not match the buffer's native lane count.
    #[error("array length mismatch: buffer holds {expected} lanes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The native planner returned a null handle.
    #[error("native planner returned no plan for {family} transform of shape {dims:?}")]
    PlanCreationFailed {
        family: TransformFamily,
        dims: Vec<usize>,
    },

    /// Transform dimensions do not fit the bound buffers.
    #[error("shape mismatch for {family} transform {dims:?}: {reason}")]
    ShapeMismatch {
        family: TransformFamily,
        dims: Vec<usize>,
        reason: String,
    },

    /// Input and output buffers were allocated by different engines.
    #[error("input and output buffers belong to different native engines")]
    EngineMismatch,

    /// No usable native library could be loaded.
    #[error("failed to load native FFT library: {0}")]
    LibraryLoad(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ConfigError> for FftError {
    fn from(err: ConfigError) -> Self {
        FftError::Config(err.to_string())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("unknown planner option: {0}")]
    InvalidOption(String),
}
