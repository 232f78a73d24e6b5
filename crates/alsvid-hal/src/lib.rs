//! Alsvid Hardware Abstraction Layer
//!
//! This crate provides the narrow interface between the compiler core and
//! execution backends. A backend receives a finalized IR exactly once and
//! exposes two operations:
//!
//! - [`Backend::assemble`]: in-place lowering of the IR to the backend's
//!   native gate set, validating support before anything expensive or
//!   remote happens.
//! - [`Backend::execute`]: blocking execution of an assembled IR against a
//!   [`RunConfig`], returning an [`ExecutionResult`] with probabilities,
//!   sampled [`Counts`], and (for state-vector-capable backends) the dense
//!   amplitude vector.
//!
//! Backends are selected by mode string through the [`BackendRegistry`];
//! an unknown mode fails at configuration time with
//! [`HalError::UnknownBackend`].
//!
//! # Example: a trivial backend
//!
//! ```rust
//! use alsvid_hal::{Backend, Counts, ExecutionResult, HalResult, RunConfig};
//! use alsvid_ir::Dag;
//!
//! struct Echo;
//!
//! impl Backend for Echo {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn assemble(&self, _dag: &mut Dag) -> HalResult<()> {
//!         Ok(())
//!     }
//!
//!     fn execute(&self, dag: &Dag, config: &RunConfig) -> HalResult<ExecutionResult> {
//!         let mut counts = Counts::new();
//!         counts.insert("0".repeat(dag.num_qubits()), u64::from(config.shots));
//!         Ok(ExecutionResult::from_counts(counts, config.shots))
//!     }
//! }
//!
//! let backend = Echo;
//! let mut dag = Dag::new();
//! dag.add_qubit_register("q", 2);
//! backend.assemble(&mut dag).unwrap();
//! let result = backend.execute(&dag, &RunConfig::new().configure_shots(10)).unwrap();
//! assert_eq!(result.counts.get("00"), 10);
//! ```

pub mod backend;
pub mod error;
pub mod registry;
pub mod result;

pub use backend::{Backend, RunConfig};
pub use error::{HalError, HalResult};
pub use registry::BackendRegistry;
pub use result::{Counts, ExecutionResult};
