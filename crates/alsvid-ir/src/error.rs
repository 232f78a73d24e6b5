//! IR error taxonomy.

use thiserror::Error;

use crate::qubit::{ClbitId, QubitId};

/// Errors raised while building or rewriting the IR.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// An operation referenced a quantum wire that was never declared.
    #[error("unknown qubit {qubit} in '{context}'")]
    QubitNotFound {
        /// The undeclared wire.
        qubit: QubitId,
        /// The operation that referenced it.
        context: String,
    },

    /// An operation referenced a classical wire that was never declared.
    #[error("unknown classical bit {clbit} in '{context}'")]
    ClbitNotFound {
        /// The undeclared wire.
        clbit: ClbitId,
        /// The operation that referenced it.
        context: String,
    },

    /// A gate was applied to the wrong number of qubits.
    #[error("'{gate}' takes {expected} qubits, {got} given")]
    QubitCountMismatch {
        /// Name of the gate.
        gate: String,
        /// The gate's arity.
        expected: u32,
        /// How many operands were supplied.
        got: u32,
    },

    /// The same qubit appeared twice in one operation's operand list.
    #[error("qubit {qubit} used twice in '{context}'")]
    DuplicateQubit {
        /// The repeated wire.
        qubit: QubitId,
        /// The operation that repeated it.
        context: String,
    },

    /// A node index no longer present in the graph.
    #[error("node index no longer present in the graph")]
    InvalidNode,

    /// The graph violated a structural invariant.
    #[error("malformed graph: {0}")]
    InvalidDag(String),

    /// A caller referenced a definition that was never registered.
    #[error("no gate definition registered for '{0}'")]
    UnknownDefinition(String),

    /// A parameter expression could not be resolved to a value.
    #[error("parameter '{0}' has no binding")]
    UnboundParameter(String),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
