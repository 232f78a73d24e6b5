//! Alsvid local state-vector simulator
//!
//! An exact local backend for testing, development, and small-scale
//! experiments, implementing the HAL [`Backend`](alsvid_hal::Backend)
//! contract over a dense amplitude vector.
//!
//! # Features
//!
//! - **Exact simulation**: full statevector representation
//! - **All standard gates** plus opaque dense-matrix unitary nodes
//!   (controls and inverse handled)
//! - **Mid-circuit collapse**: measurement, reset, and classically
//!   conditioned gates run shot by shot against a per-shot classical
//!   register
//! - **Subroutine inlining**: caller nodes execute through their cached
//!   definition bodies
//!
//! Memory bounds the qubit count: 20 qubits ≈ 16 MB of amplitudes, 25 ≈
//! 512 MB. The default limit is 20.
//!
//! # Example
//!
//! ```rust
//! use alsvid_adapter_sim::SimulatorBackend;
//! use alsvid_compile::{OptimizationLevel, compile};
//! use alsvid_hal::{Backend, RunConfig};
//! use alsvid_ir::Circuit;
//!
//! let circuit = Circuit::bell().unwrap();
//! let mut dag = compile(&circuit, OptimizationLevel::LIGHT).unwrap();
//!
//! let backend = SimulatorBackend::new();
//! backend.assemble(&mut dag).unwrap();
//! let result = backend
//!     .execute(&dag, &RunConfig::new().configure_shots(1000))
//!     .unwrap();
//!
//! // A Bell pair reads only 00 or 11.
//! assert_eq!(result.counts.get("00") + result.counts.get("11"), 1000);
//! ```

mod backend;
mod statevector;

pub use backend::SimulatorBackend;
pub use statevector::Statevector;
