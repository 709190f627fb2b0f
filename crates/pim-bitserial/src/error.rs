//! Error types for the verification harness

use pim_backends::BackendError;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that stop a test case or a whole category
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Unknown name, bad generator range, population too small, type mismatch
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The device refused an allocate, copy or execute call
    #[error("{call} failed: {source}")]
    Backend {
        call: &'static str,
        #[source]
        source: BackendError,
    },
}

impl HarnessError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wrap a device error with the name of the failing call
    pub fn backend(call: &'static str) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::Backend { call, source }
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_names_call() {
        let err = HarnessError::backend("allocate")(BackendError::InvalidConfig("x".into()));
        assert!(err.is_backend());
        assert!(err.to_string().starts_with("allocate failed"));
        assert!(!HarnessError::config("bad").is_backend());
    }
}
