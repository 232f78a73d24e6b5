//! QASM 2.0 emitter for serializing compiled IR.

use alsvid_ir::{
    BinOp, ClbitId, Condition, Dag, DagNode, DefId, OpKind, ParameterExpression, QubitId,
    RegisterInfo, RegisterKind, StandardGate,
};
use rustc_hash::FxHashSet;

use crate::error::{QasmError, QasmResult};

/// Emit a compiled IR as QASM 2.0 source code.
///
/// Register declarations use the QASM 2.0 style (`qreg q[n];` /
/// `creg c[n];`), gate definitions in the IR become `gate … { … }` blocks,
/// classical conditions become `if (creg==val) …;` prefixes, and
/// measurements use `measure q[i] -> c[j];`. Gates absent from
/// `qelib1.inc` (`iswap`, `ryy`) are given inline definitions so the
/// output is self-contained.
pub fn emit(dag: &Dag) -> QasmResult<String> {
    Emitter::new(dag).emit()
}

struct Emitter<'a> {
    dag: &'a Dag,
    registers: Vec<RegisterInfo>,
    output: String,
}

impl<'a> Emitter<'a> {
    fn new(dag: &'a Dag) -> Self {
        Self {
            dag,
            registers: dag.registers(),
            output: String::new(),
        }
    }

    fn emit(mut self) -> QasmResult<String> {
        self.writeln("OPENQASM 2.0;");
        self.writeln("include \"qelib1.inc\";");
        self.writeln("");

        self.emit_nonstandard_definitions();
        self.emit_gate_definitions()?;
        self.emit_registers();

        for (_, node) in self.dag.topological_ops() {
            self.emit_operation(node)?;
        }

        Ok(self.output)
    }

    /// Inline definitions for standard gates `qelib1.inc` does not carry.
    fn emit_nonstandard_definitions(&mut self) {
        let mut needs_iswap = false;
        let mut needs_ryy = false;
        let mut note = |gate: &StandardGate| match gate {
            StandardGate::ISwap => needs_iswap = true,
            StandardGate::RYY(_) => needs_ryy = true,
            _ => {}
        };
        for (_, node) in self.dag.topological_ops() {
            if let DagNode::Op(op) = node {
                if let Some(gate) = op.kind.gate() {
                    note(gate);
                }
            }
        }
        for i in 0..self.dag.num_definitions() {
            for callee in self.dag.callees(DefId(i as u32)) {
                note(&callee.gate);
            }
        }

        if needs_iswap {
            self.writeln("gate iswap a, b { s a; s b; h a; cx a, b; cx b, a; h b; }");
        }
        if needs_ryy {
            // RYY(t) = (RX(π/2)⊗RX(π/2)) · RZZ(t) · (RX(-π/2)⊗RX(-π/2))
            self.writeln(
                "gate ryy(theta) a, b { rx(pi/2) a; rx(pi/2) b; cx a, b; rz(theta) b; \
                 cx a, b; rx(-pi/2) a; rx(-pi/2) b; }",
            );
        }
        if needs_iswap || needs_ryy {
            self.writeln("");
        }
    }

    /// `gate name(params?) q0, … { body }` blocks for every definition
    /// cluster in the IR.
    fn emit_gate_definitions(&mut self) -> QasmResult<()> {
        let num_defs = self.dag.num_definitions();
        for i in 0..num_defs {
            let def = DefId(i as u32);
            let Some(template) = self.dag.definition(def) else {
                continue;
            };

            // Caller sites carry no parameter lists, so a body with
            // unbound symbols cannot be rendered as a callable program.
            let mut symbols: FxHashSet<String> = FxHashSet::default();
            for callee in self.dag.callees(def) {
                for param in callee.gate.parameters() {
                    symbols.extend(param.symbols());
                }
            }
            if !symbols.is_empty() {
                return Err(QasmError::Unsupported(format!(
                    "gate definition '{}' has unbound symbolic parameters",
                    template.name
                )));
            }

            let args: Vec<String> = (0..template.num_qubits).map(|q| format!("q{q}")).collect();

            let mut body = String::new();
            for callee in self.dag.callees(def) {
                let name = gate_name(&callee.gate);
                let call_params = self.gate_params(&callee.gate)?;
                let operands: Vec<String> =
                    callee.positions.iter().map(|p| format!("q{p}")).collect();
                if call_params.is_empty() {
                    body.push_str(&format!(" {name} {};", operands.join(", ")));
                } else {
                    body.push_str(&format!(" {name}({call_params}) {};", operands.join(", ")));
                }
            }

            self.writeln(&format!(
                "gate {} {} {{{body} }}",
                template.name,
                args.join(", "),
            ));
        }
        if num_defs > 0 {
            self.writeln("");
        }
        Ok(())
    }

    fn emit_registers(&mut self) {
        let mut any = false;
        for reg in self.registers.clone() {
            match reg.kind {
                RegisterKind::Quantum => self.writeln(&format!("qreg {}[{}];", reg.name, reg.size)),
                RegisterKind::Classical => {
                    self.writeln(&format!("creg {}[{}];", reg.name, reg.size));
                }
            }
            any = true;
        }
        if any {
            self.writeln("");
        }
    }

    fn emit_operation(&mut self, node: &DagNode) -> QasmResult<()> {
        match node {
            DagNode::Op(op) => {
                let prefix = self.condition_prefix(op.condition.as_ref())?;
                match &op.kind {
                    OpKind::Gate(gate) => {
                        let name = gate_name(gate);
                        let params = self.gate_params(gate)?;
                        let qubits = self.qubit_list(&op.qubits)?;
                        if params.is_empty() {
                            self.writeln(&format!("{prefix}{name} {qubits};"));
                        } else {
                            self.writeln(&format!("{prefix}{name}({params}) {qubits};"));
                        }
                    }
                    OpKind::Measure => {
                        for (q, c) in op.qubits.iter().zip(&op.clbits) {
                            let q = self.qubit_ref(*q)?;
                            let c = self.clbit_ref(*c)?;
                            self.writeln(&format!("{prefix}measure {q} -> {c};"));
                        }
                    }
                    OpKind::Reset => {
                        let qubits = self.qubit_list(&op.qubits)?;
                        self.writeln(&format!("{prefix}reset {qubits};"));
                    }
                    OpKind::Barrier => {
                        let qubits = self.qubit_list(&op.qubits)?;
                        if qubits.is_empty() {
                            self.writeln("barrier;");
                        } else {
                            self.writeln(&format!("barrier {qubits};"));
                        }
                    }
                }
                Ok(())
            }
            DagNode::Caller(caller) => {
                let prefix = self.condition_prefix(caller.condition.as_ref())?;
                let template = self
                    .dag
                    .definition(caller.def)
                    .ok_or_else(|| QasmError::Unsupported("caller without definition".into()))?;
                let qubits = self.qubit_list(&caller.qubits)?;
                self.writeln(&format!("{prefix}{} {qubits};", template.name));
                Ok(())
            }
            DagNode::Unitary(u) => Err(QasmError::Unsupported(format!(
                "opaque unitary '{}' has no QASM 2.0 rendering",
                u.name
            ))),
            _ => Ok(()),
        }
    }

    /// `if (creg==val) ` prefix for a conditioned operation.
    ///
    /// QASM 2.0 conditions compare one whole classical register for
    /// equality; anything else has no rendering.
    fn condition_prefix(&self, condition: Option<&Condition>) -> QasmResult<String> {
        let Some(cond) = condition else {
            return Ok(String::new());
        };
        if cond.cmp != alsvid_ir::Comparator::Eq {
            return Err(QasmError::Unsupported(format!(
                "condition comparator '{}' (QASM 2.0 allows only ==)",
                cond.cmp
            )));
        }

        let reg = self
            .registers
            .iter()
            .filter(|r| r.kind == RegisterKind::Classical)
            .find(|r| {
                let bits: Vec<ClbitId> = (r.start..r.start + r.size).map(ClbitId).collect();
                bits == cond.clbits
            })
            .ok_or_else(|| {
                QasmError::Unsupported(
                    "condition bits do not form a whole classical register".into(),
                )
            })?;

        Ok(format!("if ({}=={}) ", reg.name, cond.value))
    }

    fn gate_params(&self, gate: &StandardGate) -> QasmResult<String> {
        let params = gate.parameters();
        let rendered: QasmResult<Vec<String>> = params.iter().map(|p| emit_param(p)).collect();
        Ok(rendered?.join(", "))
    }

    fn qubit_list(&self, qubits: &[QubitId]) -> QasmResult<String> {
        let refs: QasmResult<Vec<String>> = qubits.iter().map(|&q| self.qubit_ref(q)).collect();
        Ok(refs?.join(", "))
    }

    fn qubit_ref(&self, qubit: QubitId) -> QasmResult<String> {
        self.registers
            .iter()
            .filter(|r| r.kind == RegisterKind::Quantum)
            .find(|r| qubit.0 >= r.start && qubit.0 < r.start + r.size)
            .map(|r| format!("{}[{}]", r.name, qubit.0 - r.start))
            .ok_or_else(|| {
                QasmError::Unsupported(format!("qubit {qubit} belongs to no declared register"))
            })
    }

    fn clbit_ref(&self, clbit: ClbitId) -> QasmResult<String> {
        self.registers
            .iter()
            .filter(|r| r.kind == RegisterKind::Classical)
            .find(|r| clbit.0 >= r.start && clbit.0 < r.start + r.size)
            .map(|r| format!("{}[{}]", r.name, clbit.0 - r.start))
            .ok_or_else(|| {
                QasmError::Unsupported(format!("clbit {clbit} belongs to no declared register"))
            })
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

/// QASM 2.0 gate-name remapping table.
fn gate_name(gate: &StandardGate) -> &'static str {
    match gate {
        StandardGate::U(_, _, _) => "u3",
        StandardGate::P(_) => "u1",
        StandardGate::CP(_) => "cu1",
        other => other.name(),
    }
}

/// Render a parameter expression, preferring exact pi fractions.
fn emit_param(param: &ParameterExpression) -> QasmResult<String> {
    match param {
        ParameterExpression::Constant(v) => {
            let pi = std::f64::consts::PI;
            let rendered = if (*v - pi).abs() < 1e-10 {
                "pi".into()
            } else if (*v + pi).abs() < 1e-10 {
                "-pi".into()
            } else if (*v - pi / 2.0).abs() < 1e-10 {
                "pi/2".into()
            } else if (*v + pi / 2.0).abs() < 1e-10 {
                "-pi/2".into()
            } else if (*v - pi / 4.0).abs() < 1e-10 {
                "pi/4".into()
            } else if (*v + pi / 4.0).abs() < 1e-10 {
                "-pi/4".into()
            } else {
                format!("{v:.6}")
            };
            Ok(rendered)
        }
        ParameterExpression::Pi => Ok("pi".into()),
        ParameterExpression::Symbol(name) => Ok(name.clone()),
        ParameterExpression::Index(i) => Err(QasmError::Unsupported(format!(
            "trainable parameter reference theta[{i}] in exported circuit"
        ))),
        ParameterExpression::Neg(e) => Ok(format!("-({})", emit_param(e)?)),
        ParameterExpression::Binary(op, a, b) => {
            let symbol = match op {
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
                BinOp::Div => "/",
            };
            Ok(format!("({} {symbol} {})", emit_param(a)?, emit_param(b)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::{Comparator, OpNode};

    fn two_qubit_dag() -> Dag {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_clbit_register("c", 2);
        dag
    }

    #[test]
    fn test_emit_bell() {
        let mut dag = two_qubit_dag();
        dag.add_op(OpNode::gate(StandardGate::H, [QubitId(0)])).unwrap();
        dag.add_op(OpNode::gate(StandardGate::CX, [QubitId(0), QubitId(1)]))
            .unwrap();
        dag.add_op(OpNode::measure(QubitId(0), ClbitId(0))).unwrap();
        dag.add_op(OpNode::measure(QubitId(1), ClbitId(1))).unwrap();

        let qasm = emit(&dag).unwrap();
        assert!(qasm.contains("OPENQASM 2.0;"));
        assert!(qasm.contains("include \"qelib1.inc\";"));
        assert!(qasm.contains("qreg q[2];"));
        assert!(qasm.contains("creg c[2];"));
        assert!(qasm.contains("h q[0];"));
        assert!(qasm.contains("cx q[0], q[1];"));
        assert!(qasm.contains("measure q[0] -> c[0];"));
        assert!(qasm.contains("measure q[1] -> c[1];"));
    }

    #[test]
    fn test_emit_parameterized() {
        let mut dag = two_qubit_dag();
        dag.add_op(OpNode::gate(
            StandardGate::Rx(ParameterExpression::constant(std::f64::consts::PI / 2.0)),
            [QubitId(0)],
        ))
        .unwrap();

        let qasm = emit(&dag).unwrap();
        assert!(qasm.contains("rx(pi/2) q[0];"));
    }

    #[test]
    fn test_emit_name_remap() {
        let mut dag = two_qubit_dag();
        dag.add_op(OpNode::gate(
            StandardGate::P(ParameterExpression::pi()),
            [QubitId(0)],
        ))
        .unwrap();
        dag.add_op(OpNode::gate(
            StandardGate::CP(ParameterExpression::constant(0.5)),
            [QubitId(0), QubitId(1)],
        ))
        .unwrap();

        let qasm = emit(&dag).unwrap();
        assert!(qasm.contains("u1(pi) q[0];"));
        assert!(qasm.contains("cu1(0.500000) q[0], q[1];"));
    }

    #[test]
    fn test_emit_condition() {
        let mut dag = two_qubit_dag();
        dag.add_op(OpNode::measure(QubitId(0), ClbitId(0))).unwrap();
        dag.add_op(OpNode::measure(QubitId(1), ClbitId(1))).unwrap();
        dag.add_op(
            OpNode::gate(StandardGate::X, [QubitId(0)]).with_condition(Condition::new(
                [ClbitId(0), ClbitId(1)],
                Comparator::Eq,
                2,
            )),
        )
        .unwrap();

        let qasm = emit(&dag).unwrap();
        assert!(qasm.contains("if (c==2) x q[0];"));
    }

    #[test]
    fn test_emit_partial_register_condition_unsupported() {
        let mut dag = two_qubit_dag();
        dag.add_op(OpNode::measure(QubitId(0), ClbitId(0))).unwrap();
        dag.add_op(
            OpNode::gate(StandardGate::X, [QubitId(0)])
                .with_condition(Condition::new([ClbitId(0)], Comparator::Eq, 1)),
        )
        .unwrap();

        let err = emit(&dag).unwrap_err();
        assert!(matches!(err, QasmError::Unsupported(_)));
    }

    #[test]
    fn test_emit_gate_definition_and_caller() {
        let mut dag = two_qubit_dag();
        let def = dag.add_definition("bellpair", 2, None);
        dag.add_callee(def, StandardGate::H, [0]).unwrap();
        dag.add_callee(def, StandardGate::CX, [0, 1]).unwrap();
        dag.add_caller(def, [QubitId(1), QubitId(0)], None).unwrap();

        let qasm = emit(&dag).unwrap();
        assert!(qasm.contains("gate bellpair q0, q1 { h q0; cx q0, q1; }"));
        assert!(qasm.contains("bellpair q[1], q[0];"));
    }

    #[test]
    fn test_emit_iswap_inline_definition() {
        let mut dag = two_qubit_dag();
        dag.add_op(OpNode::gate(StandardGate::ISwap, [QubitId(0), QubitId(1)]))
            .unwrap();

        let qasm = emit(&dag).unwrap();
        assert!(qasm.contains("gate iswap a, b"));
        assert!(qasm.contains("iswap q[0], q[1];"));
    }

    #[test]
    fn test_emit_multiple_registers() {
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        dag.add_qubit_register("anc", 1);
        dag.add_op(OpNode::gate(StandardGate::CX, [QubitId(1), QubitId(2)]))
            .unwrap();

        let qasm = emit(&dag).unwrap();
        assert!(qasm.contains("qreg q[2];"));
        assert!(qasm.contains("qreg anc[1];"));
        assert!(qasm.contains("cx q[1], anc[0];"));
    }

    #[test]
    fn test_emit_unitary_unsupported() {
        use num_complex::Complex64;

        let mut dag = two_qubit_dag();
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        dag.add_unitary(alsvid_ir::UnitaryNode {
            name: "blob".into(),
            matrix: vec![zero, one, one, zero],
            qubits: vec![QubitId(0)],
            controls: 0,
            inverse: false,
            condition: None,
        })
        .unwrap();

        let err = emit(&dag).unwrap_err();
        assert!(matches!(err, QasmError::Unsupported(_)));
    }
}
