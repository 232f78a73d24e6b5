//! Error types for the QASM crate.

use alsvid_ir::IrError;
use thiserror::Error;

/// Errors that can occur during parsing or emission.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QasmError {
    /// Lexer error (invalid token).
    #[error("lexical error at byte {position}: {message}")]
    LexerError {
        /// Byte offset of the offending input.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// Unexpected token.
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the parser was looking for.
        expected: String,
        /// What it found instead.
        found: String,
    },

    /// Unexpected end of input.
    #[error("input ended while parsing {0}")]
    UnexpectedEof(String),

    /// Invalid version header.
    #[error("unsupported OPENQASM version {0} (expected 2.0)")]
    InvalidVersion(String),

    /// Undefined register or gate identifier.
    #[error("identifier '{0}' is not declared")]
    UndefinedIdentifier(String),

    /// A register or gate name declared twice.
    #[error("'{0}' is declared twice")]
    DuplicateDeclaration(String),

    /// Call of an unknown gate.
    #[error("call of unknown gate '{0}'")]
    UnknownGate(String),

    /// Wrong number of qubit arguments.
    #[error("'{gate}' takes {expected} qubit arguments, {got} given")]
    WrongQubitCount {
        /// Name of the gate.
        gate: String,
        /// Expected number of qubits.
        expected: usize,
        /// Actual number of qubits provided.
        got: usize,
    },

    /// Wrong number of parameters.
    #[error("'{gate}' takes {expected} parameters, {got} given")]
    WrongParameterCount {
        /// Name of the gate.
        gate: String,
        /// Expected number of parameters.
        expected: usize,
        /// Actual number of parameters provided.
        got: usize,
    },

    /// Register index out of bounds.
    #[error("{register}[{index}] is out of bounds (size {size})")]
    IndexOutOfBounds {
        /// Register name.
        register: String,
        /// Offending index.
        index: usize,
        /// Register size.
        size: usize,
    },

    /// IR feature with no QASM 2.0 rendering.
    #[error("no OpenQASM 2.0 rendering: {0}")]
    Unsupported(String),

    /// IR error during circuit construction.
    #[error("circuit construction failed: {0}")]
    Circuit(#[from] IrError),
}

/// Result type for QASM operations.
pub type QasmResult<T> = Result<T, QasmError>;
