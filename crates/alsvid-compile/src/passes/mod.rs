//! Built-in optimization passes.
//!
//! All passes mutate the IR in place through the graph's
//! `substitute_nodes`/`remove_nodes` primitives and leave the wire
//! invariant intact.

mod basis_state;
mod cancel;
mod pure_state;

pub use basis_state::BasisStatePropagation;
pub use cancel::GateCancellation;
pub use pure_state::PureStateSimplification;

/// Tolerance for angle comparisons.
pub(crate) const EPSILON: f64 = 1e-10;
