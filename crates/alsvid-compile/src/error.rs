//! Error types for the compilation crate.

use alsvid_ir::IrError;
use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// A gate cannot be expressed in the compiler's basis set: it declares
    /// no factors and no matrix, or its decomposition recursion bottoms out
    /// without reaching primary gates. Aborts compilation; no partial IR is
    /// returned.
    #[error("Unsupported gate '{name}': {reason}")]
    UnsupportedGate {
        /// Name of the offending gate.
        name: String,
        /// Why it could not be lowered.
        reason: String,
    },

    /// A gate or feature is used that the target cannot execute.
    #[error("Operation not supported by target: {0}")]
    Validation(String),

    /// The lookahead router made zero progress in a full pass.
    #[error("Routing failed: {0}")]
    Routing(String),

    /// The circuit needs more qubits than the device provides.
    #[error("Circuit requires {required} qubits but device has {available}")]
    CircuitTooLarge {
        /// Qubits required by the circuit.
        required: usize,
        /// Qubits available on the device.
        available: u32,
    },

    /// No coupling map available for a target-aware stage.
    #[error("No coupling map available")]
    MissingCouplingMap,

    /// No layout available for a stage that requires one.
    #[error("No layout available")]
    MissingLayout,

    /// Underlying IR error.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
