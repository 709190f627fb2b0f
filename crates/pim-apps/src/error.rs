//! Error types for the benchmark applications

use pim_backends::BackendError;

/// Result type for application pipelines
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The device refused a call
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Inputs with inconsistent shapes or parameters
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
