//! Error types for the mesh kernel bridge.

use thiserror::Error;

pub type KernelResult<T> = Result<T, KernelError>;

/// Errors surfaced by the native geometry/meshing engine.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("mesh kernel runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("mesh kernel operation failed: {0}")]
    OperationFailed(String),

    #[error("mesh kernel session already held")]
    SessionAlreadyHeld,
}

impl KernelError {
    /// Maps this error onto the build error taxonomy's stable code.
    pub fn code(&self) -> &'static str {
        match self {
            KernelError::RuntimeUnavailable(_) => "kernel_runtime_unavailable",
            KernelError::OperationFailed(_) => "kernel_failure",
            KernelError::SessionAlreadyHeld => "kernel_failure",
        }
    }
}

impl From<cxx::Exception> for KernelError {
    fn from(err: cxx::Exception) -> Self {
        KernelError::OperationFailed(err.what().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_build_error_taxonomy() {
        assert_eq!(
            KernelError::RuntimeUnavailable("x".into()).code(),
            "kernel_runtime_unavailable"
        );
        assert_eq!(KernelError::OperationFailed("x".into()).code(), "kernel_failure");
        assert_eq!(KernelError::SessionAlreadyHeld.code(), "kernel_failure");
    }
}
