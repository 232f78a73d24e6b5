//! Alsvid compilation pipeline
//!
//! This crate turns a flat [`Circuit`] into an optimized, hardware-mappable
//! IR graph. It hosts the four stages of the pipeline:
//!
//! - **Compiler** ([`compile`]): lowers the instruction list into a
//!   [`Dag`], decomposing custom gates through their declared factors or
//!   ZYZ matrix synthesis and caching definition/callee clusters.
//! - **Pass manager** ([`PassManager`]): runs the level-selected sequence
//!   of graph rewrites (gate cancellation, constant-basis-state
//!   propagation, pure-state simplification).
//! - **Layout** ([`generate_direct_layout`]): a budgeted CSP backtracker
//!   searching for a logical→physical placement that satisfies every
//!   multi-qubit gate without SWAPs.
//! - **Routing** ([`generate_lookahead_routing`]): the heuristic lookahead
//!   SWAP inserter used when no direct layout exists.
//!
//! [`transpile`] chains the stages: compile and optimize, attempt a direct
//! layout, and fall back to routing when the placement search comes back
//! empty.
//!
//! # Example
//!
//! ```rust
//! use alsvid_compile::{transpile, CouplingMap, OptimizationLevel};
//! use alsvid_ir::Circuit;
//!
//! let circuit = Circuit::bell().unwrap();
//! let coupling = CouplingMap::linear(2);
//!
//! let out = transpile(&circuit, &coupling, OptimizationLevel::LIGHT).unwrap();
//! // Two qubits on a two-qubit line: a direct layout exists, no SWAPs.
//! assert!(out.routing.is_none());
//! ```

pub mod compiler;
pub mod error;
pub mod layout;
pub mod manager;
pub mod pass;
pub mod passes;
pub mod property;
pub mod routing;
pub mod unitary;

pub use compiler::{compile, synthesize_1q};
pub use error::{CompileError, CompileResult};
pub use layout::{
    BudgetExceeded, CouplingMap, DirectLayoutStatus, Layout, SearchBudget, generate_direct_layout,
};
pub use manager::{OptimizationLevel, PassManager};
pub use pass::{Pass, PassKind};
pub use property::PropertySet;
pub use routing::{RoutingConfig, RoutingPlan, generate_lookahead_routing};
pub use unitary::Unitary2x2;

use rustc_hash::FxHashSet;
use tracing::info;

use alsvid_ir::{Circuit, Dag};

/// Everything the pipeline produced for one circuit.
#[derive(Debug)]
pub struct TranspileResult {
    /// The compiled and optimized IR.
    pub dag: Dag,
    /// The chosen logical→physical placement. When `routing` is `Some`,
    /// this is the trivial initial layout the SWAP schedule starts from.
    pub layout: Layout,
    /// How the direct-layout search ended.
    pub layout_status: DirectLayoutStatus,
    /// SWAP schedule, present only when direct layout failed.
    pub routing: Option<RoutingPlan>,
}

/// Compile, optimize, and map a circuit onto a device coupling map.
///
/// Runs [`compile`] (which includes the optimizer pipeline for `level`),
/// derives the gate interaction pairs, and attempts a direct layout within
/// the default search budget. Layout infeasibility is an expected outcome,
/// not an error: the pipeline falls back to the trivial layout plus
/// lookahead SWAP insertion.
///
/// Fails with [`CompileError::CircuitTooLarge`] when the circuit needs more
/// qubits than the device has, and propagates [`CompileError::Routing`]
/// from the fallback router.
pub fn transpile(
    circuit: &Circuit,
    coupling: &CouplingMap,
    level: OptimizationLevel,
) -> CompileResult<TranspileResult> {
    if circuit.num_qubits() > coupling.num_qubits() as usize {
        return Err(CompileError::CircuitTooLarge {
            required: circuit.num_qubits(),
            available: coupling.num_qubits(),
        });
    }

    let dag = compile(circuit, level)?;

    let interactions = dag.collect_gate_qubits();
    let connections = logical_connections(&interactions);

    let mut budget = SearchBudget::default();
    let (layout, status) = generate_direct_layout(
        circuit.num_qubits() as u32,
        &connections,
        coupling,
        &mut budget,
    );

    if let Some(layout) = layout {
        info!(
            "direct layout found after {} search steps",
            budget.spent()
        );
        return Ok(TranspileResult {
            dag,
            layout,
            layout_status: status,
            routing: None,
        });
    }

    info!("direct layout unavailable ({status}), falling back to routing");
    let plan = generate_lookahead_routing(&interactions, coupling, &RoutingConfig::default())?;
    Ok(TranspileResult {
        dag,
        layout: Layout::trivial(coupling.num_qubits()),
        layout_status: status,
        routing: Some(plan),
    })
}

/// Deduplicated pairwise qubit connections of every multi-qubit
/// interaction. Three-qubit gates contribute all three pairs.
fn logical_connections(
    interactions: &[(alsvid_ir::NodeIndex, Vec<alsvid_ir::QubitId>)],
) -> Vec<(u32, u32)> {
    let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
    let mut connections = vec![];
    for (_, qubits) in interactions {
        for (i, a) in qubits.iter().enumerate() {
            for b in &qubits[i + 1..] {
                let pair = (a.0.min(b.0), a.0.max(b.0));
                if seen.insert(pair) {
                    connections.push(pair);
                }
            }
        }
    }
    connections
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::QubitId;

    #[test]
    fn test_transpile_direct_layout() {
        let mut circuit = Circuit::with_size("line", 3, 0);
        circuit
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(2))
            .unwrap();

        let coupling = CouplingMap::linear(3);
        let out = transpile(&circuit, &coupling, OptimizationLevel::NONE).unwrap();

        // (0, 2) is satisfiable by placement alone on a 3-qubit line.
        assert_eq!(out.layout_status, DirectLayoutStatus::Found);
        assert!(out.routing.is_none());
        let p0 = out.layout.physical(QubitId(0)).unwrap();
        let p2 = out.layout.physical(QubitId(2)).unwrap();
        assert!(coupling.is_connected(p0, p2));
    }

    #[test]
    fn test_transpile_falls_back_to_routing() {
        // A triangle of interactions cannot be placed on a line.
        let mut circuit = Circuit::with_size("tri", 3, 0);
        circuit
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .cx(QubitId(1), QubitId(2))
            .unwrap()
            .cx(QubitId(0), QubitId(2))
            .unwrap();

        let coupling = CouplingMap::linear(3);
        let out = transpile(&circuit, &coupling, OptimizationLevel::NONE).unwrap();

        assert_eq!(out.layout_status, DirectLayoutStatus::Infeasible);
        let plan = out.routing.expect("routing plan expected");
        assert!(plan.num_swaps() >= 1);
    }

    #[test]
    fn test_transpile_rejects_oversized_circuit() {
        let circuit = Circuit::with_size("big", 5, 0);
        let coupling = CouplingMap::linear(3);
        let err = transpile(&circuit, &coupling, OptimizationLevel::NONE).unwrap_err();
        assert!(matches!(err, CompileError::CircuitTooLarge { .. }));
    }

    #[test]
    fn test_connections_deduplicated() {
        let interactions = vec![
            (alsvid_ir::NodeIndex::new(0), vec![QubitId(0), QubitId(1)]),
            (alsvid_ir::NodeIndex::new(1), vec![QubitId(1), QubitId(0)]),
            (
                alsvid_ir::NodeIndex::new(2),
                vec![QubitId(0), QubitId(1), QubitId(2)],
            ),
        ];
        let connections = logical_connections(&interactions);
        assert_eq!(connections, vec![(0, 1), (0, 2), (1, 2)]);
    }
}
