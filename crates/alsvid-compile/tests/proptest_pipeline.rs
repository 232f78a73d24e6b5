//! Property-based tests for the optimizer, layout, and routing stages.

use std::f64::consts::PI;

use proptest::prelude::*;

use alsvid_compile::{
    CouplingMap, OptimizationLevel, RoutingConfig, SearchBudget, Unitary2x2, compile,
    generate_direct_layout, generate_lookahead_routing,
};
use alsvid_ir::{Circuit, NodeIndex, QubitId, StandardGate};

/// One Z-family gate with its matrix, for the rotation-merge property.
#[derive(Debug, Clone)]
enum ZGate {
    Z,
    S,
    Sdg,
    T,
    Tdg,
    Rz(f64),
}

impl ZGate {
    fn standard(&self) -> StandardGate {
        match self {
            ZGate::Z => StandardGate::Z,
            ZGate::S => StandardGate::S,
            ZGate::Sdg => StandardGate::Sdg,
            ZGate::T => StandardGate::T,
            ZGate::Tdg => StandardGate::Tdg,
            ZGate::Rz(a) => StandardGate::Rz(alsvid_ir::ParameterExpression::constant(*a)),
        }
    }
}

fn arb_z_gate() -> impl Strategy<Value = ZGate> {
    prop_oneof![
        Just(ZGate::Z),
        Just(ZGate::S),
        Just(ZGate::Sdg),
        Just(ZGate::T),
        Just(ZGate::Tdg),
        (-2.0 * PI..2.0 * PI).prop_map(ZGate::Rz),
    ]
}

/// A connected coupling graph: a random spanning path plus extra edges.
fn arb_connected_coupling() -> impl Strategy<Value = CouplingMap> {
    (3_u32..=7).prop_flat_map(|n| {
        let extra = prop::collection::vec((0..n, 0..n), 0..=4);
        (Just(n), extra).prop_map(|(n, extra)| {
            let mut edges: Vec<(u32, u32)> = (0..n - 1).map(|i| (i, i + 1)).collect();
            for (a, b) in extra {
                if a != b {
                    edges.push((a.min(b), a.max(b)));
                }
            }
            CouplingMap::from_edges(n, &edges)
        })
    })
}

fn arb_gate_list(num_qubits: u32) -> impl Strategy<Value = Vec<(NodeIndex, Vec<QubitId>)>> {
    prop::collection::vec(
        (0..num_qubits, 0..num_qubits).prop_filter("distinct", |(a, b)| a != b),
        1..=12,
    )
    .prop_map(|pairs| {
        pairs
            .into_iter()
            .enumerate()
            .map(|(i, (a, b))| (NodeIndex::new(i), vec![QubitId(a), QubitId(b)]))
            .collect()
    })
}

proptest! {
    /// Merging a commuting Z-axis run into a single Rz of the summed angle
    /// (mod 4π) preserves the unitary up to global phase.
    #[test]
    fn rotation_merge_preserves_unitary(gates in prop::collection::vec(arb_z_gate(), 2..=8)) {
        let mut circuit = Circuit::with_size("zrun", 1, 0);
        let mut product = Unitary2x2::identity();
        for g in &gates {
            let std = g.standard();
            circuit.gate(std.clone(), [QubitId(0)]).unwrap();
            let m = Unitary2x2::from_standard_gate(&std, &[]).unwrap();
            product = m.mul(&product);
        }

        let dag = compile(&circuit, OptimizationLevel::LIGHT).unwrap();
        dag.verify_integrity().unwrap();

        // The merged result is at most one rotation.
        prop_assert!(dag.num_ops() <= 1);
        let merged = match dag.topological_ops().first() {
            Some((_, node)) => {
                let op = node.op().expect("op node");
                let gate = op.kind.gate().expect("gate op");
                Unitary2x2::from_standard_gate(gate, &[]).unwrap()
            }
            None => Unitary2x2::identity(),
        };
        prop_assert!(merged.approx_eq_up_to_phase(&product, 1e-8));
    }

    /// Whenever the CSP returns a layout, it is a bijection and every
    /// required connection lands on a coupling edge.
    #[test]
    fn direct_layout_output_is_feasible(
        coupling in arb_connected_coupling(),
        pairs in prop::collection::vec((0_u32..5, 0_u32..5), 0..=6),
    ) {
        let logical = 5.min(coupling.num_qubits());
        let connections: Vec<(u32, u32)> = pairs
            .into_iter()
            .filter(|(a, b)| a != b && *a < logical && *b < logical)
            .collect();

        let mut budget = SearchBudget::iterations(200_000);
        let (layout, _) = generate_direct_layout(logical, &connections, &coupling, &mut budget);

        if let Some(layout) = layout {
            let mut used = std::collections::HashSet::new();
            for l in 0..logical {
                let p = layout.physical(QubitId(l)).expect("assigned");
                prop_assert!(used.insert(p), "physical qubit reused");
            }
            for (a, b) in connections {
                let pa = layout.physical(QubitId(a)).unwrap();
                let pb = layout.physical(QubitId(b)).unwrap();
                prop_assert!(coupling.is_connected(pa, pb));
            }
        }
    }

    /// On a connected coupling graph the router terminates and resolves
    /// every gate onto adjacent physical qubits, consistently with its own
    /// swap schedule.
    #[test]
    fn router_terminates_and_satisfies_adjacency(
        (coupling, gates) in arb_connected_coupling()
            .prop_flat_map(|c| {
                let n = c.num_qubits();
                (Just(c), arb_gate_list(n))
            }),
    ) {
        let plan = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default())
            .expect("connected coupling must route");

        // Replay the schedule: every recorded swap is a coupling edge, and
        // each gate's recorded physical qubits match the replayed layout.
        let mut layout = alsvid_compile::Layout::trivial(coupling.num_qubits());
        for (i, (_, qubits)) in gates.iter().enumerate() {
            if let Some(swaps) = plan.swaps.get(&i) {
                for &(p1, p2) in swaps {
                    prop_assert!(coupling.is_connected(p1, p2));
                    layout.swap_by_physical(p1, p2);
                }
            }
            let phys = &plan.gate_layout[i];
            for (j, &q) in qubits.iter().enumerate() {
                prop_assert_eq!(layout.physical(q), Some(phys[j]));
            }
            for (a, &pa) in phys.iter().enumerate() {
                for &pb in &phys[a + 1..] {
                    prop_assert!(coupling.is_connected(pa, pb));
                }
            }
        }
    }
}
