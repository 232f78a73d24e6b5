//! Pure-state simplification.
//!
//! Like constant-basis-state propagation, but tracking a continuous
//! description instead of a five-state lattice: each wire carries the
//! accumulated 2×2 unitary preparing its current state from |0⟩, composed
//! algebraically as single-qubit gates are walked. Wherever a SWAP meets
//! wires whose states are statically known, the swap is replaced by
//! single-qubit state-preparation rotations (both sides known) or by prep
//! rotations plus two CNOTs (one side known), both cheaper than the three
//! CNOTs a real swap costs after translation. The same ZYZ machinery as
//! gate synthesis produces the rotations.
//!
//! The walk stops at the first caller node and at the first conditioned
//! gate, matching the conservative scope of the basis-state pass.

use rustc_hash::FxHashMap;

use alsvid_ir::dag::{Dag, DagNode, NodeIndex, OpKind, OpNode};
use alsvid_ir::{QubitId, StandardGate};

use crate::compiler::synthesize_1q;
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;
use crate::unitary::Unitary2x2;

use super::EPSILON;

/// Per-wire tracked state: the unitary preparing it from |0⟩, or unknown.
type WireState = Option<Unitary2x2>;

enum Action {
    Replace(NodeIndex, Vec<OpNode>),
}

/// Pure-state simplification pass.
pub struct PureStateSimplification;

impl PureStateSimplification {
    /// Create a new simplification pass.
    pub fn new() -> Self {
        Self
    }

    fn analyze(dag: &Dag) -> Vec<Action> {
        let mut states: FxHashMap<QubitId, WireState> = FxHashMap::default();
        for q in dag.qubits() {
            states.insert(q, Some(Unitary2x2::identity()));
        }
        let mut actions = vec![];

        for (idx, node) in dag.topological_ops() {
            if matches!(node, DagNode::Caller(_)) || node.condition().is_some() {
                break;
            }

            match node {
                DagNode::Unitary(u) => {
                    for &q in &u.qubits {
                        states.insert(q, None);
                    }
                }
                DagNode::Op(op) => match &op.kind {
                    OpKind::Barrier => {}
                    OpKind::Reset => {
                        states.insert(op.qubits[0], Some(Unitary2x2::identity()));
                    }
                    OpKind::Measure => {
                        for &q in &op.qubits {
                            if !is_computational(states[&q]) {
                                states.insert(q, None);
                            }
                        }
                    }
                    OpKind::Gate(StandardGate::Swap) => {
                        Self::analyze_swap(idx, &op.qubits, &mut states, &mut actions);
                    }
                    OpKind::Gate(gate) if gate.num_qubits() == 1 => {
                        let q = op.qubits[0];
                        let next = match (states[&q], Unitary2x2::from_standard_gate(gate, &[])) {
                            (Some(u), Some(g)) => Some(g * u),
                            _ => None,
                        };
                        states.insert(q, next);
                    }
                    OpKind::Gate(_) => {
                        for &q in &op.qubits {
                            states.insert(q, None);
                        }
                    }
                },
                _ => {}
            }
        }

        actions
    }

    fn analyze_swap(
        idx: NodeIndex,
        qubits: &[QubitId],
        states: &mut FxHashMap<QubitId, WireState>,
        actions: &mut Vec<Action>,
    ) {
        let a = qubits[0];
        let b = qubits[1];
        let sa = states[&a];
        let sb = states[&b];

        match (sa, sb) {
            (Some(ua), Some(ub)) => {
                // Both sides known: re-prepare each wire into the other's
                // state with rotations only.
                let mut ops = vec![];
                for gate in synthesize_1q(&(ub * ua.dagger())) {
                    ops.push(OpNode::gate(gate, [a]));
                }
                for gate in synthesize_1q(&(ua * ub.dagger())) {
                    ops.push(OpNode::gate(gate, [b]));
                }
                actions.push(Action::Replace(idx, ops));
            }
            (Some(ua), None) => {
                actions.push(Action::Replace(idx, one_sided_swap(a, b, &ua)));
            }
            (None, Some(ub)) => {
                actions.push(Action::Replace(idx, one_sided_swap(b, a, &ub)));
            }
            (None, None) => {}
        }

        // The tracked states travel with the wires.
        states.insert(a, sb);
        states.insert(b, sa);
    }
}

/// Rewrite `swap(known, other)` where only `known`'s state is statically
/// determined: rotate `known` back to |0⟩, swap a |0⟩ wire with two CNOTs,
/// then re-prepare the state on `other`.
fn one_sided_swap(known: QubitId, other: QubitId, u: &Unitary2x2) -> Vec<OpNode> {
    let mut ops = vec![];
    for gate in synthesize_1q(&u.dagger()) {
        ops.push(OpNode::gate(gate, [known]));
    }
    ops.push(OpNode::gate(StandardGate::CX, [other, known]));
    ops.push(OpNode::gate(StandardGate::CX, [known, other]));
    for gate in synthesize_1q(u) {
        ops.push(OpNode::gate(gate, [other]));
    }
    ops
}

/// Whether a tracked state is a computational basis state (measurement
/// leaves it intact).
fn is_computational(state: WireState) -> bool {
    let Some(u) = state else { return false };
    let (amp0, amp1) = u.prepared_state();
    amp0.norm() < EPSILON || amp1.norm() < EPSILON
}

impl Default for PureStateSimplification {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for PureStateSimplification {
    fn name(&self) -> &'static str {
        "PureStateSimplification"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut Dag, _properties: &mut PropertySet) -> CompileResult<()> {
        for action in Self::analyze(dag) {
            match action {
                Action::Replace(idx, ops) => {
                    dag.substitute_nodes(&[idx], ops).map_err(CompileError::Ir)?;
                    dag.remove_nodes(&[idx], false).map_err(CompileError::Ir)?;
                }
            }
        }
        Ok(())
    }

    fn should_run(&self, dag: &Dag, _properties: &PropertySet) -> bool {
        dag.num_ops() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::ParameterExpression;
    use std::f64::consts::PI;

    fn run_pass(dag: &mut Dag) {
        let mut props = PropertySet::new();
        PureStateSimplification::new().run(dag, &mut props).unwrap();
    }

    fn names(dag: &Dag) -> Vec<String> {
        dag.topological_ops()
            .iter()
            .filter_map(|(_, n)| n.op().map(|o| o.name().to_string()))
            .collect()
    }

    #[test]
    fn test_swap_of_known_states_becomes_rotations() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_op(OpNode::gate(
            StandardGate::Ry(ParameterExpression::constant(0.7)),
            [QubitId(0)],
        ))
        .unwrap();
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        // No two-qubit gate survives.
        assert!(names(&dag).iter().all(|n| n != "swap" && n != "cx"));
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_one_sided_swap_uses_two_cnots() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 3);
        // Entangle q1 with q2 so q1's state is unknown; q0 stays known.
        dag.add_op(OpNode::gate(StandardGate::H, [QubitId(1)])).unwrap();
        dag.add_op(OpNode::gate(StandardGate::CX, [QubitId(1), QubitId(2)]))
            .unwrap();
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        let n = names(&dag);
        assert!(!n.contains(&"swap".to_string()));
        assert_eq!(n.iter().filter(|s| *s == "cx").count(), 3); // 1 original + 2 rewrite
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_swap_of_unknown_wires_kept() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 3);
        // Both swap operands become unknown through a shared CZ.
        dag.add_op(OpNode::gate(StandardGate::H, [QubitId(0)])).unwrap();
        dag.add_op(OpNode::gate(StandardGate::CZ, [QubitId(0), QubitId(1)]))
            .unwrap();
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert!(names(&dag).contains(&"swap".to_string()));
    }

    #[test]
    fn test_fresh_wires_swap_vanishes() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        // Both wires prepare |0⟩; both re-preparation unitaries are
        // identity, so the swap disappears without replacement.
        assert_eq!(dag.num_ops(), 0);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_stops_at_conditioned_gate() {
        use alsvid_ir::{ClbitId, Comparator, Condition};

        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_clbit_register("c", 1);
        dag.add_op(OpNode::measure(QubitId(0), ClbitId(0))).unwrap();
        dag.add_op(
            OpNode::gate(StandardGate::X, [QubitId(0)])
                .with_condition(Condition::new([ClbitId(0)], Comparator::Eq, 1)),
        )
        .unwrap();
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert!(names(&dag).contains(&"swap".to_string()));
    }

    #[test]
    fn test_rotation_composition_tracks_through_chain() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        // Two quarter turns land q0 in |1⟩ exactly.
        dag.add_op(OpNode::gate(
            StandardGate::Rx(ParameterExpression::constant(PI / 2.0)),
            [QubitId(0)],
        ))
        .unwrap();
        dag.add_op(OpNode::gate(
            StandardGate::Rx(ParameterExpression::constant(PI / 2.0)),
            [QubitId(0)],
        ))
        .unwrap();
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert!(!names(&dag).contains(&"swap".to_string()));
        dag.verify_integrity().unwrap();
    }
}
