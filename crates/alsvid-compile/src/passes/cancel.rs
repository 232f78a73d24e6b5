//! Redundant-gate cancellation by commutation analysis.
//!
//! Consecutive single-wire runs of commuting gates (same rotation axis)
//! are merged into a single rotation of the summed equivalent angle, taken
//! mod 4π; runs that sum to a multiple of 2π vanish entirely (any residue
//! is global phase). Adjacent identical self-inverse multi-qubit gates on
//! identical qubit lists cancel pairwise. Runs qualify only when no node
//! carries a classical condition and the run is a genuine straight-line
//! chain on its wire.

use std::f64::consts::PI;

use petgraph::Direction;
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

use alsvid_ir::dag::{Dag, DagNode, NodeIndex, OpKind, OpNode};
use alsvid_ir::{ParameterExpression, QubitId, StandardGate, WireKind};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::EPSILON;

/// Rotation axis of a commuting single-qubit gate family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

/// Classify a gate into its axis series with its equivalent rotation
/// angle: the Paulis count as π, S/Sdg as ±π/2, T/Tdg as ±π/4, and
/// rotations as their own (concrete) angle. Symbolic angles disqualify.
fn axis_angle(gate: &StandardGate) -> Option<(Axis, f64)> {
    match gate {
        StandardGate::X => Some((Axis::X, PI)),
        StandardGate::SX => Some((Axis::X, PI / 2.0)),
        StandardGate::SXdg => Some((Axis::X, -PI / 2.0)),
        StandardGate::Rx(p) => p.as_f64().map(|a| (Axis::X, a)),

        StandardGate::Y => Some((Axis::Y, PI)),
        StandardGate::Ry(p) => p.as_f64().map(|a| (Axis::Y, a)),

        StandardGate::Z => Some((Axis::Z, PI)),
        StandardGate::S => Some((Axis::Z, PI / 2.0)),
        StandardGate::Sdg => Some((Axis::Z, -PI / 2.0)),
        StandardGate::T => Some((Axis::Z, PI / 4.0)),
        StandardGate::Tdg => Some((Axis::Z, -PI / 4.0)),
        StandardGate::Rz(p) => p.as_f64().map(|a| (Axis::Z, a)),
        StandardGate::P(p) => p.as_f64().map(|a| (Axis::Z, a)),

        _ => None,
    }
}

/// The single rotation replacing a merged run.
fn axis_rotation(axis: Axis, angle: f64) -> StandardGate {
    let p = ParameterExpression::constant(angle);
    match axis {
        Axis::X => StandardGate::Rx(p),
        Axis::Y => StandardGate::Ry(p),
        Axis::Z => StandardGate::Rz(p),
    }
}

/// Redundant-gate cancellation pass.
pub struct GateCancellation;

impl GateCancellation {
    /// Create a new cancellation pass.
    pub fn new() -> Self {
        Self
    }

    /// Find one adjacent identical self-inverse multi-qubit pair.
    fn find_self_inverse_pair(dag: &Dag) -> Option<(NodeIndex, NodeIndex)> {
        let graph = dag.graph();
        for (idx, node) in dag.topological_ops() {
            let DagNode::Op(op) = node else { continue };
            let OpKind::Gate(gate) = &op.kind else {
                continue;
            };
            if op.qubits.len() < 2 || !gate.is_self_inverse() || op.condition.is_some() {
                continue;
            }

            // The candidate partner must be the immediate successor on
            // every wire the gate touches.
            let mut partner: Option<NodeIndex> = None;
            let mut adjacent = true;
            for &q in &op.qubits {
                let succ = graph
                    .edges_directed(idx, Direction::Outgoing)
                    .find(|e| e.weight().wire == WireKind::Qubit(q))
                    .map(|e| e.target());
                match (partner, succ) {
                    (_, None) => {
                        adjacent = false;
                        break;
                    }
                    (None, Some(s)) => partner = Some(s),
                    (Some(p), Some(s)) if p != s => {
                        adjacent = false;
                        break;
                    }
                    _ => {}
                }
            }
            if !adjacent {
                continue;
            }
            let partner = partner?;

            if let Some(DagNode::Op(succ_op)) = dag.node(partner) {
                if let OpKind::Gate(succ_gate) = &succ_op.kind {
                    if succ_gate == gate
                        && succ_op.qubits == op.qubits
                        && succ_op.condition.is_none()
                    {
                        return Some((idx, partner));
                    }
                }
            }
        }
        None
    }

    /// Find one maximal same-axis run of length ≥ 2 on a single wire.
    fn find_axis_run(dag: &Dag) -> Option<(QubitId, Axis, Vec<NodeIndex>, f64)> {
        // One topological pass, indexed per qubit: consecutive entries in a
        // per-qubit list are consecutive on that wire.
        let topo = dag.topological_ops();
        let mut per_qubit: FxHashMap<QubitId, Vec<(NodeIndex, &DagNode)>> = FxHashMap::default();
        for &(idx, node) in &topo {
            for &q in node.qubits() {
                per_qubit.entry(q).or_default().push((idx, node));
            }
        }

        for (&qubit, ops) in &per_qubit {
            let mut run: Vec<NodeIndex> = vec![];
            let mut run_axis: Option<Axis> = None;
            let mut run_sum = 0.0f64;

            for &(idx, node) in ops {
                let step = match node {
                    DagNode::Op(op) if op.condition.is_none() && op.qubits.len() == 1 => {
                        op.kind.gate().and_then(axis_angle)
                    }
                    _ => None,
                };

                match (step, run_axis) {
                    (Some((axis, angle)), Some(current)) if axis == current => {
                        run.push(idx);
                        run_sum += angle;
                    }
                    (Some((axis, angle)), _) => {
                        if run.len() >= 2 {
                            return Some((qubit, run_axis.unwrap(), run, run_sum));
                        }
                        run = vec![idx];
                        run_axis = Some(axis);
                        run_sum = angle;
                    }
                    (None, _) => {
                        if run.len() >= 2 {
                            return Some((qubit, run_axis.unwrap(), run, run_sum));
                        }
                        run.clear();
                        run_axis = None;
                        run_sum = 0.0;
                    }
                }
            }
            if run.len() >= 2 {
                return Some((qubit, run_axis.unwrap(), run, run_sum));
            }
        }
        None
    }

    /// Rewrite one cancellable site. Returns whether anything changed.
    fn cancel_one(dag: &mut Dag) -> CompileResult<bool> {
        if let Some((a, b)) = Self::find_self_inverse_pair(dag) {
            dag.remove_nodes(&[a, b], true).map_err(CompileError::Ir)?;
            return Ok(true);
        }

        if let Some((qubit, axis, run, sum)) = Self::find_axis_run(dag) {
            // Reduce mod 4π (the SU(2) period); a residue of 0 or 2π leaves
            // only global phase, so the whole run vanishes.
            let reduced = sum.rem_euclid(4.0 * PI);
            let vanishes = reduced < EPSILON
                || (4.0 * PI - reduced) < EPSILON
                || (reduced - 2.0 * PI).abs() < EPSILON;

            if vanishes {
                dag.remove_nodes(&run, true).map_err(CompileError::Ir)?;
            } else {
                let angle = if reduced > 2.0 * PI {
                    reduced - 4.0 * PI
                } else {
                    reduced
                };
                dag.substitute_nodes(
                    &run,
                    vec![OpNode::gate(axis_rotation(axis, angle), [qubit])],
                )
                .map_err(CompileError::Ir)?;
                dag.remove_nodes(&run, false).map_err(CompileError::Ir)?;
            }
            return Ok(true);
        }

        Ok(false)
    }
}

impl Default for GateCancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for GateCancellation {
    fn name(&self) -> &'static str {
        "GateCancellation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut Dag, _properties: &mut PropertySet) -> CompileResult<()> {
        // Rewrite one site at a time until a fixed point; each rewrite
        // strictly reduces the op count, which bounds the loop.
        let max_iterations = dag.num_ops() * 2 + 16;
        for _ in 0..max_iterations {
            if !Self::cancel_one(dag)? {
                break;
            }
        }
        Ok(())
    }

    fn should_run(&self, dag: &Dag, _properties: &PropertySet) -> bool {
        dag.num_ops() > 1
    }
}
