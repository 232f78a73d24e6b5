//! `OpenQASM` 2.0 parser and emitter for Alsvid
//!
//! This crate reads and writes the textual `OpenQASM` 2.0 circuit format,
//! connecting the compiler core to standard tooling.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version declaration | `OPENQASM 2.0;` |
//! | Register declarations | `qreg q[5];`, `creg c[5];` |
//! | Standard gates | `h q[0];`, `cx q[0], q[1];` |
//! | Parameterized gates | `rx(pi/4) q[0];` |
//! | Gate definitions | `gate bellpair a, b { h a; cx a, b; }` |
//! | Classical conditions | `if (c==3) x q[0];` |
//! | Measurements | `measure q[0] -> c[0];` |
//! | Register broadcast | `h q;`, `measure q -> c;` |
//! | Barriers and reset | `barrier q;`, `reset q[0];` |
//! | Comments | `// comment` |
//!
//! # Example: Parsing QASM
//!
//! ```rust
//! use alsvid_qasm::parse;
//!
//! let qasm = r#"
//!     OPENQASM 2.0;
//!     include "qelib1.inc";
//!     qreg q[2];
//!     creg c[2];
//!     h q[0];
//!     cx q[0], q[1];
//!     measure q -> c;
//! "#;
//!
//! let circuit = parse(qasm).unwrap();
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.instructions().len(), 4);
//! ```
//!
//! # Example: Emitting a compiled IR
//!
//! ```rust
//! use alsvid_compile::{OptimizationLevel, compile};
//! use alsvid_ir::Circuit;
//! use alsvid_qasm::emit;
//!
//! let dag = compile(&Circuit::bell().unwrap(), OptimizationLevel::NONE).unwrap();
//! let qasm = emit(&dag).unwrap();
//!
//! assert!(qasm.contains("OPENQASM 2.0;"));
//! assert!(qasm.contains("h q[0];"));
//! assert!(qasm.contains("cx q[0], q[1];"));
//! ```
//!
//! # Round-Trip
//!
//! Compiling a circuit, emitting it, and parsing the result reproduces
//! the gate sequence and wire counts (custom gates keep their bodies;
//! bound parameterized instances get suffixed definition names).

pub mod emitter;
pub mod error;
pub mod lexer;
pub mod parser;

pub use emitter::emit;
pub use error::{QasmError, QasmResult};
pub use parser::parse;
