//! Alsvid Circuit Intermediate Representation
//!
//! This crate provides the core data structures for representing quantum
//! circuits in Alsvid. It forms the foundation of the compilation stack.
//!
//! # Overview
//!
//! Client code builds a [`Circuit`] — a flat, ordered instruction list over
//! declared registers. The compiler lowers it into a [`Dag`]: a directed
//! acyclic graph whose edges carry wire continuity and whose rewrite
//! primitives ([`Dag::substitute_nodes`], [`Dag::remove_nodes`]) power the
//! optimizer and routing stages.
//!
//! # Core Components
//!
//! - **Qubits and classical bits**: [`QubitId`], [`ClbitId`]
//! - **Gates**: [`StandardGate`] for the primary basis set, [`CustomGate`]
//!   for user-defined operations with declared `factors` and/or a matrix
//! - **Parameters**: [`ParameterExpression`] — serializable expressions,
//!   optionally referencing a circuit's trainable parameter vector
//! - **Conditions**: [`Condition`] — classical register comparisons guarding
//!   execution
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **IR graph**: [`Dag`] with op, definition/callee/caller, and opaque
//!   unitary nodes
//!
//! # Example: Building a Bell circuit
//!
//! ```rust
//! use alsvid_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.instructions().len(), 3);
//! ```

pub mod circuit;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use circuit::{Circuit, Register};
pub use dag::{
    CalleeNode, CallerNode, Dag, DagEdge, DagNode, DefId, DefinitionNode, NodeIndex, OpKind,
    OpNode, RegisterInfo, RegisterKind, UnitaryNode, Wire, WireKind,
};
pub use error::{IrError, IrResult};
pub use gate::{Comparator, Condition, CustomGate, GateFactor, GateKind, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::{BinOp, ParameterExpression};
pub use qubit::{ClbitId, QubitId};
