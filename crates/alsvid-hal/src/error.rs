//! Error types for the HAL crate.

use alsvid_ir::IrError;
use thiserror::Error;

/// Errors that can occur in HAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// A gate or feature of the IR is not supported by the target backend.
    /// Raised by `assemble`, before any execution is attempted.
    #[error("Operation not supported by backend: {0}")]
    Validation(String),

    /// The requested backend mode does not match any registered backend.
    /// Raised at configuration time, before compilation or execution.
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// Execution failed inside the backend.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Underlying IR error.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
