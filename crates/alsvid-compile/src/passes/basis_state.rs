//! Constant-basis-state propagation.
//!
//! Tracks, per wire, a symbolic classical basis state (|0⟩, |1⟩, |+⟩, |−⟩
//! or unknown) while walking the graph in topological order, starting all
//! wires at |0⟩. The known single-qubit Cliffords H, X, Y, Z update the
//! tracked state through a lookup table (phases dropped); any other gate
//! degrades a wire to unknown. Controlled gates with a classically-known
//! control either disappear (control |0⟩) or collapse to their
//! uncontrolled form (control |1⟩). SWAP gates between wires with known
//! states are rewritten into a short fixed Clifford sequence, or deleted
//! outright when both states agree.
//!
//! The walk stops at the first caller node and at the first conditioned
//! gate: subroutine bodies and classically-controlled branches are not
//! analyzed.

use rustc_hash::FxHashMap;

use alsvid_ir::dag::{Dag, DagNode, NodeIndex, OpKind, OpNode};
use alsvid_ir::{QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// The tracked symbolic state of one wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BasisState {
    Zero,
    One,
    Plus,
    Minus,
    Unknown,
}

impl BasisState {
    fn is_known(self) -> bool {
        self != BasisState::Unknown
    }

    /// Apply a tracked Clifford. Phases are dropped; only the basis label
    /// matters to this pass.
    fn after(self, gate: &StandardGate) -> BasisState {
        use BasisState::*;
        match gate {
            StandardGate::I => self,
            StandardGate::H => match self {
                Zero => Plus,
                One => Minus,
                Plus => Zero,
                Minus => One,
                Unknown => Unknown,
            },
            StandardGate::X => match self {
                Zero => One,
                One => Zero,
                Plus => Plus,
                Minus => Minus,
                Unknown => Unknown,
            },
            StandardGate::Y => match self {
                Zero => One,
                One => Zero,
                Plus => Minus,
                Minus => Plus,
                Unknown => Unknown,
            },
            StandardGate::Z => match self {
                Zero => Zero,
                One => One,
                Plus => Minus,
                Minus => Plus,
                Unknown => Unknown,
            },
            _ => Unknown,
        }
    }

    /// A fixed Clifford sequence preparing `to` from `self`, in circuit
    /// order. Only defined between known states.
    fn conversion(self, to: BasisState) -> Option<Vec<StandardGate>> {
        use BasisState::*;
        use StandardGate::{H, X, Z};
        Some(match (self, to) {
            (Zero, Zero) | (One, One) | (Plus, Plus) | (Minus, Minus) => vec![],
            (Zero, One) | (One, Zero) => vec![X],
            (Zero, Plus) | (Plus, Zero) => vec![H],
            (One, Minus) | (Minus, One) => vec![H],
            (Plus, Minus) | (Minus, Plus) => vec![Z],
            (Zero, Minus) => vec![X, H],
            (Minus, Zero) => vec![H, X],
            (One, Plus) => vec![X, H],
            (Plus, One) => vec![H, X],
            (Unknown, _) | (_, Unknown) => return None,
        })
    }
}

/// A rewrite decided during the walk, applied afterwards so node indices
/// stay valid for the whole analysis.
enum Action {
    /// Remove a gate that is a provable no-op, bridging its wires.
    Remove(NodeIndex),
    /// Replace a node with a new instruction list.
    Replace(NodeIndex, Vec<OpNode>),
}

/// Constant-basis-state propagation pass.
pub struct BasisStatePropagation;

impl BasisStatePropagation {
    /// Create a new propagation pass.
    pub fn new() -> Self {
        Self
    }

    fn analyze(dag: &Dag) -> Vec<Action> {
        let mut states: FxHashMap<QubitId, BasisState> = FxHashMap::default();
        for q in dag.qubits() {
            states.insert(q, BasisState::Zero);
        }
        let mut actions = vec![];

        for (idx, node) in dag.topological_ops() {
            // Subroutine bodies and classically-controlled branches are
            // out of scope for this analysis.
            if matches!(node, DagNode::Caller(_)) || node.condition().is_some() {
                break;
            }

            match node {
                DagNode::Unitary(u) => {
                    for &q in &u.qubits {
                        states.insert(q, BasisState::Unknown);
                    }
                }
                DagNode::Op(op) => match &op.kind {
                    OpKind::Barrier => {}
                    OpKind::Reset => {
                        states.insert(op.qubits[0], BasisState::Zero);
                    }
                    OpKind::Measure => {
                        for &q in &op.qubits {
                            let state = states[&q];
                            if !matches!(state, BasisState::Zero | BasisState::One) {
                                states.insert(q, BasisState::Unknown);
                            }
                        }
                    }
                    OpKind::Gate(gate) => {
                        Self::analyze_gate(idx, gate, &op.qubits, &mut states, &mut actions);
                    }
                },
                _ => {}
            }
        }

        actions
    }

    fn analyze_gate(
        idx: NodeIndex,
        gate: &StandardGate,
        qubits: &[QubitId],
        states: &mut FxHashMap<QubitId, BasisState>,
        actions: &mut Vec<Action>,
    ) {
        match gate {
            // Tracked single-qubit Cliffords.
            StandardGate::I | StandardGate::H | StandardGate::X | StandardGate::Y
            | StandardGate::Z => {
                let q = qubits[0];
                let next = states[&q].after(gate);
                states.insert(q, next);
            }

            // Controlled Paulis with a classically-known control.
            StandardGate::CX | StandardGate::CY | StandardGate::CZ => {
                let control = qubits[0];
                let target = qubits[1];
                match states[&control] {
                    BasisState::Zero => {
                        // Control never fires; the gate is a no-op.
                        actions.push(Action::Remove(idx));
                    }
                    BasisState::One => {
                        // Control always fires; collapse to the
                        // uncontrolled form.
                        let uncontrolled = match gate {
                            StandardGate::CX => StandardGate::X,
                            StandardGate::CY => StandardGate::Y,
                            _ => StandardGate::Z,
                        };
                        let next = states[&target].after(&uncontrolled);
                        states.insert(target, next);
                        actions.push(Action::Replace(
                            idx,
                            vec![OpNode::gate(uncontrolled, [target])],
                        ));
                    }
                    _ => {
                        states.insert(control, BasisState::Unknown);
                        states.insert(target, BasisState::Unknown);
                    }
                }
            }

            StandardGate::Swap => {
                let a = qubits[0];
                let b = qubits[1];
                let sa = states[&a];
                let sb = states[&b];

                if sa.is_known() && sb.is_known() {
                    if sa == sb {
                        // Swapping two wires in the identical state does
                        // nothing.
                        actions.push(Action::Remove(idx));
                    } else {
                        // Exchange states with single-qubit Cliffords
                        // instead of an actual swap.
                        let mut ops = vec![];
                        for g in sa.conversion(sb).expect("both states known") {
                            ops.push(OpNode::gate(g, [a]));
                        }
                        for g in sb.conversion(sa).expect("both states known") {
                            ops.push(OpNode::gate(g, [b]));
                        }
                        actions.push(Action::Replace(idx, ops));
                    }
                }
                // The tracked states travel with the wires either way.
                states.insert(a, sb);
                states.insert(b, sa);
            }

            // Anything else degrades every touched wire.
            _ => {
                for &q in qubits {
                    states.insert(q, BasisState::Unknown);
                }
            }
        }
    }
}

impl Default for BasisStatePropagation {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for BasisStatePropagation {
    fn name(&self) -> &'static str {
        "BasisStatePropagation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut Dag, _properties: &mut PropertySet) -> CompileResult<()> {
        for action in Self::analyze(dag) {
            match action {
                Action::Remove(idx) => {
                    dag.remove_nodes(&[idx], true).map_err(CompileError::Ir)?;
                }
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
    use alsvid_ir::{ClbitId, Comparator, Condition};

    fn run_pass(dag: &mut Dag) {
        let mut props = PropertySet::new();
        BasisStatePropagation::new().run(dag, &mut props).unwrap();
    }

    fn names(dag: &Dag) -> Vec<String> {
        dag.topological_ops()
            .iter()
            .filter_map(|(_, n)| n.op().map(|o| o.name().to_string()))
            .collect()
    }

    #[test]
    fn test_cx_with_zero_control_removed() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        // Control stays |0⟩: the CX can never fire.
        dag.add_op(OpNode::gate(StandardGate::CX, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert_eq!(dag.num_ops(), 0);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_cx_with_one_control_collapses_to_x() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_op(OpNode::gate(StandardGate::X, [QubitId(0)])).unwrap();
        dag.add_op(OpNode::gate(StandardGate::CX, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert_eq!(names(&dag), vec!["x", "x"]);
        let ops = dag.topological_ops();
        let (_, last) = ops[1];
        assert_eq!(last.qubits(), &[QubitId(1)]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_cz_with_hadamard_control_untouched() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_op(OpNode::gate(StandardGate::H, [QubitId(0)])).unwrap();
        dag.add_op(OpNode::gate(StandardGate::CZ, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        // |+⟩ control is not classical; nothing to rewrite.
        assert_eq!(names(&dag), vec!["h", "cz"]);
    }

    #[test]
    fn test_swap_same_state_deleted() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert_eq!(dag.num_ops(), 0);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_swap_zero_one_becomes_x_pair() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_op(OpNode::gate(StandardGate::X, [QubitId(0)])).unwrap();
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        // |1⟩↔|0⟩ exchange is just an X on each wire.
        assert_eq!(names(&dag), vec!["x", "x", "x"]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_swap_zero_plus_becomes_hadamards() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_op(OpNode::gate(StandardGate::H, [QubitId(0)])).unwrap();
        dag.add_op(OpNode::gate(StandardGate::Swap, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert_eq!(names(&dag), vec!["h", "h", "h"]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_walk_stops_at_conditioned_gate() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_clbit_register("c", 1);
        dag.add_op(OpNode::measure(QubitId(0), ClbitId(0))).unwrap();
        dag.add_op(
            OpNode::gate(StandardGate::X, [QubitId(1)])
                .with_condition(Condition::new([ClbitId(0)], Comparator::Eq, 1)),
        )
        .unwrap();
        // This CX would be removable, but it sits behind the conditioned
        // gate and must not be analyzed.
        dag.add_op(OpNode::gate(StandardGate::CX, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert_eq!(dag.num_ops(), 3);
    }

    #[test]
    fn test_walk_stops_at_caller() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        let def = dag.add_definition("sub", 1, None);
        dag.add_callee(def, StandardGate::H, [0]).unwrap();
        dag.add_caller(def, [QubitId(0)], None).unwrap();
        dag.add_op(OpNode::gate(StandardGate::CX, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        // Caller and everything after it are untouched.
        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_reset_restores_tracking() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        // Unknown after rx, then reset back to |0⟩, so the CX is removable.
        dag.add_op(OpNode::gate(
            StandardGate::Rx(alsvid_ir::ParameterExpression::constant(0.3)),
            [QubitId(0)],
        ))
        .unwrap();
        dag.add_op(OpNode::reset(QubitId(0))).unwrap();
        dag.add_op(OpNode::gate(StandardGate::CX, [QubitId(0), QubitId(1)]))
            .unwrap();

        run_pass(&mut dag);
        assert_eq!(names(&dag), vec!["rx", "reset"]);
    }
}
