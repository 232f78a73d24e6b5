//! Circuit-to-IR lowering.
//!
//! The compiler walks a circuit's flat instruction list in order and emits
//! IR nodes. Primary (basis-set) gates are emitted directly; custom gates
//! are decomposed recursively through their declared factors, synthesized
//! from their matrix (single-qubit, via ZYZ Euler angles), or carried as
//! opaque unitary nodes (multi-qubit matrix without factors). Custom gates
//! with a body are expanded into a definition/callee cluster once per
//! compilation and referenced by cheap caller nodes afterwards.
//!
//! Trainable-parameter references are bound against the circuit's
//! parameter vector as nodes are emitted; named symbols are carried
//! through symbolically.

use rustc_hash::FxHashMap;
use tracing::debug;

use alsvid_ir::{
    Circuit, Condition, CustomGate, Dag, DefId, GateKind, Instruction, InstructionKind, OpNode,
    ParameterExpression, StandardGate, UnitaryNode,
};

use crate::error::{CompileError, CompileResult};
use crate::manager::{OptimizationLevel, PassManager};
use crate::property::PropertySet;
use crate::unitary::Unitary2x2;

/// Angle threshold below which a synthesized rotation is dropped.
const EPSILON: f64 = 1e-10;

/// Maximum recursion depth when flattening declared decompositions.
const MAX_DECOMPOSITION_DEPTH: u32 = 32;

/// Translate a circuit into a well-formed IR graph and run the optimizer
/// pipeline for the given level.
pub fn compile(circuit: &Circuit, level: OptimizationLevel) -> CompileResult<Dag> {
    let mut dag = Dag::new();

    // Allocate wires for every register in declaration order.
    for reg in circuit.qregs() {
        dag.add_qubit_register(reg.name.clone(), reg.size);
    }
    for reg in circuit.cregs() {
        dag.add_clbit_register(reg.name.clone(), reg.size);
    }

    let mut compiler = Compiler {
        dag: &mut dag,
        params: circuit.params(),
        definitions: FxHashMap::default(),
    };

    for instruction in circuit.instructions() {
        compiler.emit(instruction)?;
    }

    debug!(
        "lowered {} instructions into {} IR ops",
        circuit.instructions().len(),
        dag.num_ops()
    );

    let mut properties = PropertySet::new();
    PassManager::for_level(level).run(&mut dag, &mut properties)?;

    Ok(dag)
}

struct Compiler<'a> {
    dag: &'a mut Dag,
    params: &'a [f64],
    /// Definition cache: each custom gate is expanded into a
    /// definition/callee cluster once, keyed by gate name.
    definitions: FxHashMap<String, DefId>,
}

impl Compiler<'_> {
    fn emit(&mut self, instruction: &Instruction) -> CompileResult<()> {
        let condition = instruction.condition.as_ref();
        match &instruction.kind {
            InstructionKind::Measure => {
                for (&q, &c) in instruction.qubits.iter().zip(&instruction.clbits) {
                    self.dag.add_op(conditioned(OpNode::measure(q, c), condition))?;
                }
                Ok(())
            }
            InstructionKind::Reset => {
                for &q in &instruction.qubits {
                    self.dag.add_op(conditioned(OpNode::reset(q), condition))?;
                }
                Ok(())
            }
            InstructionKind::Barrier => {
                self.dag
                    .add_op(OpNode::barrier(instruction.qubits.iter().copied()))?;
                Ok(())
            }
            InstructionKind::Gate(GateKind::Standard(std_gate)) => {
                let op =
                    OpNode::gate(self.resolve_gate(std_gate), instruction.qubits.iter().copied());
                self.dag.add_op(conditioned(op, condition))?;
                Ok(())
            }
            InstructionKind::Gate(GateKind::Custom(custom)) => {
                self.emit_custom(custom, instruction, condition)
            }
        }
    }

    /// Lower a custom gate use site.
    fn emit_custom(
        &mut self,
        custom: &CustomGate,
        instruction: &Instruction,
        condition: Option<&Condition>,
    ) -> CompileResult<()> {
        if custom.factors.is_empty() {
            let Some(matrix) = &custom.matrix else {
                return Err(CompileError::UnsupportedGate {
                    name: custom.name.clone(),
                    reason: "gate has neither factors nor a matrix".into(),
                });
            };

            if custom.num_qubits == 1 {
                // Closed-form ZYZ synthesis of the dense matrix.
                let unitary = Unitary2x2::new(matrix[0], matrix[1], matrix[2], matrix[3]);
                let qubit = instruction.qubits[0];
                for gate in synthesize_1q(&unitary) {
                    let mut op = OpNode::gate(gate, [qubit]);
                    if let Some(cond) = condition {
                        op = op.with_condition(cond.clone());
                    }
                    self.dag.add_op(op)?;
                }
                return Ok(());
            }

            // Multi-qubit dense matrix with no declared body stays opaque.
            self.dag.add_unitary(UnitaryNode {
                name: custom.name.clone(),
                matrix: matrix.clone(),
                qubits: instruction.qubits.clone(),
                controls: 0,
                inverse: false,
                condition: condition.cloned(),
            })?;
            return Ok(());
        }

        // Body-carrying gate: expand the definition once, then emit a
        // caller bound to this use site's qubits.
        let def = match self.definitions.get(&custom.name) {
            Some(&def) => def,
            None => {
                let steps = self.flatten(custom, 0)?;
                let def =
                    self.dag
                        .add_definition(&custom.name, custom.num_qubits, custom.matrix.clone());
                for (gate, positions) in steps {
                    self.dag.add_callee(def, gate, positions)?;
                }
                self.definitions.insert(custom.name.clone(), def);
                def
            }
        };

        self.dag.add_caller(
            def,
            instruction.qubits.iter().copied(),
            condition.cloned(),
        )?;
        Ok(())
    }

    /// Recursively flatten a custom gate's declared factors into primitive
    /// body steps over local qubit positions.
    fn flatten(
        &self,
        custom: &CustomGate,
        depth: u32,
    ) -> CompileResult<Vec<(StandardGate, Vec<u32>)>> {
        if depth > MAX_DECOMPOSITION_DEPTH {
            return Err(CompileError::UnsupportedGate {
                name: custom.name.clone(),
                reason: format!(
                    "decomposition recursion exceeded depth {MAX_DECOMPOSITION_DEPTH} without reaching primary gates"
                ),
            });
        }

        let mut steps = vec![];
        for factor in &custom.factors {
            match &factor.gate {
                GateKind::Standard(gate) => {
                    let gate = match &factor.param {
                        Some(param) => reparameterize(gate, param).ok_or_else(|| {
                            CompileError::UnsupportedGate {
                                name: custom.name.clone(),
                                reason: format!(
                                    "factor '{}' does not accept a parameter",
                                    gate.name()
                                ),
                            }
                        })?,
                        None => gate.clone(),
                    };
                    steps.push((self.resolve_gate(&gate), factor.targets.clone()));
                }
                GateKind::Custom(inner) => {
                    if inner.factors.is_empty() {
                        let Some(matrix) = &inner.matrix else {
                            return Err(CompileError::UnsupportedGate {
                                name: inner.name.clone(),
                                reason: "gate has neither factors nor a matrix".into(),
                            });
                        };
                        if inner.num_qubits != 1 {
                            return Err(CompileError::UnsupportedGate {
                                name: inner.name.clone(),
                                reason: "multi-qubit matrix gate inside a decomposition".into(),
                            });
                        }
                        let unitary = Unitary2x2::new(matrix[0], matrix[1], matrix[2], matrix[3]);
                        for gate in synthesize_1q(&unitary) {
                            steps.push((gate, factor.targets.clone()));
                        }
                        continue;
                    }

                    // Remap the inner body's local positions through this
                    // factor's target subset.
                    for (gate, positions) in self.flatten(inner, depth + 1)? {
                        let mapped: Vec<u32> = positions
                            .iter()
                            .map(|&p| factor.targets[p as usize])
                            .collect();
                        steps.push((gate, mapped));
                    }
                }
            }
        }
        Ok(steps)
    }

    /// Bind trainable-vector references (`Index`) in a gate's parameters
    /// to their concrete values. Named symbols stay symbolic; backends
    /// that need concrete angles reject them at assemble time.
    fn resolve_gate(&self, gate: &StandardGate) -> StandardGate {
        let bind = |p: &ParameterExpression| match p.evaluate(self.params) {
            Some(v) if p.is_symbolic() => ParameterExpression::constant(v),
            _ => p.clone(),
        };
        match gate {
            StandardGate::Rx(p) => StandardGate::Rx(bind(p)),
            StandardGate::Ry(p) => StandardGate::Ry(bind(p)),
            StandardGate::Rz(p) => StandardGate::Rz(bind(p)),
            StandardGate::P(p) => StandardGate::P(bind(p)),
            StandardGate::U(t, p, l) => StandardGate::U(bind(t), bind(p), bind(l)),
            StandardGate::CRx(p) => StandardGate::CRx(bind(p)),
            StandardGate::CRy(p) => StandardGate::CRy(bind(p)),
            StandardGate::CRz(p) => StandardGate::CRz(bind(p)),
            StandardGate::CP(p) => StandardGate::CP(bind(p)),
            StandardGate::RXX(p) => StandardGate::RXX(bind(p)),
            StandardGate::RYY(p) => StandardGate::RYY(bind(p)),
            StandardGate::RZZ(p) => StandardGate::RZZ(bind(p)),
            other => other.clone(),
        }
    }
}

/// Re-attach an instruction's guard to an emitted op.
fn conditioned(op: OpNode, condition: Option<&Condition>) -> OpNode {
    match condition {
        Some(cond) => op.with_condition(cond.clone()),
        None => op,
    }
}

/// Synthesize a single-qubit unitary into at most three rotations.
///
/// `U = Rz(α) · Ry(β) · Rz(γ)` up to global phase, emitted in circuit
/// order (γ first). Near-zero angles are dropped.
pub fn synthesize_1q(unitary: &Unitary2x2) -> Vec<StandardGate> {
    let (alpha, beta, gamma, _phase) = unitary.zyz_decomposition();

    let alpha = Unitary2x2::normalize_angle(alpha);
    let beta = Unitary2x2::normalize_angle(beta);
    let gamma = Unitary2x2::normalize_angle(gamma);

    let mut gates = vec![];
    if gamma.abs() > EPSILON {
        gates.push(StandardGate::Rz(ParameterExpression::constant(gamma)));
    }
    if beta.abs() > EPSILON {
        gates.push(StandardGate::Ry(ParameterExpression::constant(beta)));
    }
    if alpha.abs() > EPSILON {
        gates.push(StandardGate::Rz(ParameterExpression::constant(alpha)));
    }
    gates
}

/// Rebuild a parameterized standard gate with a replacement angle.
fn reparameterize(gate: &StandardGate, param: &ParameterExpression) -> Option<StandardGate> {
    let p = param.clone();
    Some(match gate {
        StandardGate::Rx(_) => StandardGate::Rx(p),
        StandardGate::Ry(_) => StandardGate::Ry(p),
        StandardGate::Rz(_) => StandardGate::Rz(p),
        StandardGate::P(_) => StandardGate::P(p),
        StandardGate::CRx(_) => StandardGate::CRx(p),
        StandardGate::CRy(_) => StandardGate::CRy(p),
        StandardGate::CRz(_) => StandardGate::CRz(p),
        StandardGate::CP(_) => StandardGate::CP(p),
        StandardGate::RXX(_) => StandardGate::RXX(p),
        StandardGate::RYY(_) => StandardGate::RYY(p),
        StandardGate::RZZ(_) => StandardGate::RZZ(p),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::{Comparator, DagNode, GateFactor, QubitId};
    use num_complex::Complex64;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn op_names(dag: &Dag) -> Vec<String> {
        dag.topological_ops()
            .iter()
            .map(|(_, n)| match n {
                DagNode::Op(op) => op.name().to_string(),
                DagNode::Caller(caller) => dag
                    .definition(caller.def)
                    .map_or_else(|| "caller".into(), |d| d.name.clone()),
                DagNode::Unitary(u) => u.name.clone(),
                _ => "?".into(),
            })
            .collect()
    }

    #[test]
    fn test_compile_bell() {
        let circuit = Circuit::bell().unwrap();
        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();

        assert_eq!(dag.num_qubits(), 2);
        assert_eq!(dag.num_clbits(), 2);
        assert_eq!(op_names(&dag), vec!["h", "cx", "measure", "measure"]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_unsupported_gate_aborts() {
        let mut circuit = Circuit::with_size("bad", 1, 0);
        circuit
            .gate(CustomGate::new("mystery", 1), [QubitId(0)])
            .unwrap();

        let err = compile(&circuit, OptimizationLevel::NONE).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedGate { .. }));
    }

    #[test]
    fn test_matrix_only_1q_synthesized() {
        // The Hadamard matrix, provided as a raw matrix gate.
        let s = 1.0 / 2.0_f64.sqrt();
        let gate = CustomGate::new("raw_h", 1).with_matrix(vec![
            c(s, 0.0),
            c(s, 0.0),
            c(s, 0.0),
            c(-s, 0.0),
        ]);
        let mut circuit = Circuit::with_size("m1q", 1, 0);
        circuit.gate(gate, [QubitId(0)]).unwrap();

        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        // ZYZ of H: Rz, Ry, Rz (all three angles nonzero).
        let names = op_names(&dag);
        assert!(!names.is_empty() && names.len() <= 3);
        assert!(names.iter().all(|n| n == "rz" || n == "ry"));
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_matrix_only_2q_becomes_unitary_node() {
        let mut m = vec![c(0.0, 0.0); 16];
        for i in 0..4 {
            m[i * 4 + (i ^ 1)] = c(1.0, 0.0);
        }
        let gate = CustomGate::new("opaque2", 2).with_matrix(m);
        let mut circuit = Circuit::with_size("m2q", 2, 0);
        circuit.gate(gate, [QubitId(0), QubitId(1)]).unwrap();

        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        let ops = dag.topological_ops();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0].1, DagNode::Unitary(_)));
    }

    #[test]
    fn test_definition_cached_across_uses() {
        let my_swap = CustomGate::new("my_swap", 2).with_factors(vec![
            GateFactor::standard(StandardGate::CX, [0, 1]),
            GateFactor::standard(StandardGate::CX, [1, 0]),
            GateFactor::standard(StandardGate::CX, [0, 1]),
        ]);

        let mut circuit = Circuit::with_size("defs", 3, 0);
        circuit.gate(my_swap.clone(), [QubitId(0), QubitId(1)]).unwrap();
        circuit.gate(my_swap, [QubitId(1), QubitId(2)]).unwrap();

        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        // One definition, two cheap caller nodes.
        assert_eq!(dag.num_definitions(), 1);
        let callers = dag
            .topological_ops()
            .iter()
            .filter(|(_, n)| matches!(n, DagNode::Caller(_)))
            .count();
        assert_eq!(callers, 2);

        // Routing sees the expanded interactions of both call sites.
        let interactions = dag.collect_gate_qubits();
        assert_eq!(interactions.len(), 6);
        assert_eq!(interactions[3].1, vec![QubitId(1), QubitId(2)]);
        assert_eq!(interactions[4].1, vec![QubitId(2), QubitId(1)]);
    }

    #[test]
    fn test_nested_factors_flatten() {
        let my_swap = CustomGate::new("inner_swap", 2).with_factors(vec![
            GateFactor::standard(StandardGate::CX, [0, 1]),
            GateFactor::standard(StandardGate::CX, [1, 0]),
            GateFactor::standard(StandardGate::CX, [0, 1]),
        ]);
        // Outer gate applies the inner swap on reversed positions.
        let outer = CustomGate::new("outer", 2)
            .with_factors(vec![GateFactor::custom(my_swap, [1, 0])]);

        let mut circuit = Circuit::with_size("nest", 2, 0);
        circuit.gate(outer, [QubitId(0), QubitId(1)]).unwrap();

        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        let def = dag.find_definition("outer").unwrap();
        let callees = dag.callees(def);
        assert_eq!(callees.len(), 3);
        assert_eq!(callees[0].positions, vec![1, 0]);
        assert_eq!(callees[1].positions, vec![0, 1]);
    }

    #[test]
    fn test_condition_carried_through_decomposition() {
        let s = 1.0 / 2.0_f64.sqrt();
        let raw_h = CustomGate::new("raw_h", 1).with_matrix(vec![
            c(s, 0.0),
            c(s, 0.0),
            c(s, 0.0),
            c(-s, 0.0),
        ]);

        let mut circuit = Circuit::with_size("cond", 1, 1);
        circuit
            .cond_gate(
                raw_h,
                [QubitId(0)],
                Condition::new([alsvid_ir::ClbitId(0)], Comparator::Eq, 1),
            )
            .unwrap();

        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        for (idx, node) in dag.topological_ops() {
            assert!(node.condition().is_some(), "decomposed op lost condition");
            assert_eq!(dag.get_conbits(idx).len(), 1);
        }
    }

    #[test]
    fn test_factor_param_override() {
        use std::f64::consts::PI;

        let rot = CustomGate::new("third", 1).with_factors(vec![GateFactor::standard(
            StandardGate::Rz(ParameterExpression::constant(0.0)),
            [0],
        )
        .with_param(ParameterExpression::constant(PI / 3.0))]);

        let mut circuit = Circuit::with_size("p", 1, 0);
        circuit.gate(rot, [QubitId(0)]).unwrap();

        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        let def = dag.find_definition("third").unwrap();
        let callees = dag.callees(def);
        let StandardGate::Rz(theta) = &callees[0].gate else {
            panic!("expected rz body step");
        };
        assert_eq!(theta.as_f64(), Some(PI / 3.0));
    }

    #[test]
    fn test_trainable_params_bound_at_emission() {
        use std::f64::consts::PI;

        let mut circuit = Circuit::with_size("var", 1, 0).with_params(vec![PI / 4.0]);
        circuit
            .rx(ParameterExpression::index(0), QubitId(0))
            .unwrap();

        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        let (_, node) = dag.topological_ops()[0];
        let Some(op) = node.op() else {
            panic!("expected op node");
        };
        let alsvid_ir::OpKind::Gate(StandardGate::Rx(theta)) = &op.kind else {
            panic!("expected rx");
        };
        // The vector reference is gone; the angle is a plain constant.
        assert!(!theta.is_symbolic());
        assert!((theta.as_f64().unwrap() - PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_x_pair_cancelled_at_level_one() {
        let mut circuit = Circuit::with_size("xx", 1, 0);
        circuit.x(QubitId(0)).unwrap().x(QubitId(0)).unwrap();

        let unoptimized = compile(&circuit, OptimizationLevel::NONE).unwrap();
        assert_eq!(unoptimized.num_ops(), 2);

        let optimized = compile(&circuit, OptimizationLevel::LIGHT).unwrap();
        assert_eq!(optimized.num_ops(), 0);
        optimized.verify_integrity().unwrap();
    }
}
