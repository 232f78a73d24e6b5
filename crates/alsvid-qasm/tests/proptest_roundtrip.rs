//! Property-based tests for QASM round-trip conversion.
//!
//! Compile → emit → parse → compile must reproduce the IR's gate
//! sequence and wire counts.

use alsvid_compile::{OptimizationLevel, compile};
use alsvid_ir::{Circuit, Dag, DagNode, QubitId};
use alsvid_qasm::{emit, parse};
use proptest::prelude::*;

fn op_names(dag: &Dag) -> Vec<String> {
    dag.topological_ops()
        .iter()
        .map(|(_, n)| match n {
            DagNode::Op(op) => op.name().to_string(),
            DagNode::Caller(c) => dag
                .definition(c.def)
                .map_or_else(|| "caller".into(), |d| d.name.clone()),
            DagNode::Unitary(u) => u.name.clone(),
            _ => "?".into(),
        })
        .collect()
}

/// Gate operations that can be applied to a circuit.
#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    X(u32),
    Y(u32),
    Z(u32),
    S(u32),
    T(u32),
    Rx(u32, f64),
    CX(u32, u32),
    CZ(u32, u32),
}

impl GateOp {
    fn apply(self, circuit: &mut Circuit) {
        match self {
            GateOp::H(q) => {
                let _ = circuit.h(QubitId(q));
            }
            GateOp::X(q) => {
                let _ = circuit.x(QubitId(q));
            }
            GateOp::Y(q) => {
                let _ = circuit.y(QubitId(q));
            }
            GateOp::Z(q) => {
                let _ = circuit.z(QubitId(q));
            }
            GateOp::S(q) => {
                let _ = circuit.s(QubitId(q));
            }
            GateOp::T(q) => {
                let _ = circuit.t(QubitId(q));
            }
            GateOp::Rx(q, theta) => {
                let _ = circuit.rx(theta, QubitId(q));
            }
            GateOp::CX(c, t) => {
                let _ = circuit.cx(QubitId(c), QubitId(t));
            }
            GateOp::CZ(c, t) => {
                let _ = circuit.cz(QubitId(c), QubitId(t));
            }
        }
    }
}

fn arb_gate_op(num_qubits: u32) -> BoxedStrategy<GateOp> {
    // Angles drawn from pi fractions so the emitter's fixed-precision
    // fallback never perturbs the value.
    let angle = prop_oneof![
        Just(std::f64::consts::PI),
        Just(std::f64::consts::PI / 2.0),
        Just(std::f64::consts::PI / 4.0),
        Just(-std::f64::consts::PI / 2.0),
    ];

    if num_qubits < 2 {
        prop_oneof![
            (0..num_qubits).prop_map(GateOp::H),
            (0..num_qubits).prop_map(GateOp::X),
            (0..num_qubits).prop_map(GateOp::Y),
            (0..num_qubits).prop_map(GateOp::Z),
            (0..num_qubits).prop_map(GateOp::S),
            (0..num_qubits).prop_map(GateOp::T),
            (0..num_qubits, angle).prop_map(|(q, a)| GateOp::Rx(q, a)),
        ]
        .boxed()
    } else {
        prop_oneof![
            (0..num_qubits).prop_map(GateOp::H),
            (0..num_qubits).prop_map(GateOp::X),
            (0..num_qubits).prop_map(GateOp::Y),
            (0..num_qubits).prop_map(GateOp::Z),
            (0..num_qubits).prop_map(GateOp::S),
            (0..num_qubits).prop_map(GateOp::T),
            (0..num_qubits, angle).prop_map(|(q, a)| GateOp::Rx(q, a)),
            (0..num_qubits, 0..num_qubits)
                .prop_filter("control and target must differ", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::CX(c, t)),
            (0..num_qubits, 0..num_qubits)
                .prop_filter("control and target must differ", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::CZ(c, t)),
        ]
        .boxed()
    }
}

/// Generate a random simple circuit for property testing.
fn arb_simple_circuit() -> impl Strategy<Value = Circuit> {
    (1_u32..=5).prop_flat_map(|num_qubits| {
        (
            Just(num_qubits),
            prop::collection::vec(arb_gate_op(num_qubits), 1..=12),
        )
            .prop_map(move |(nq, ops)| {
                let mut circuit = Circuit::with_size("test", nq, nq);
                for op in ops {
                    op.apply(&mut circuit);
                }
                circuit
            })
    })
}

proptest! {
    /// Compile → emit → parse → compile preserves wire counts and the
    /// gate sequence.
    #[test]
    fn roundtrip_preserves_structure(circuit in arb_simple_circuit()) {
        let dag = compile(&circuit, OptimizationLevel::NONE)
            .expect("compile original");

        let qasm = emit(&dag).expect("emit");
        let reparsed = parse(&qasm).expect("parse emitted text");
        let redag = compile(&reparsed, OptimizationLevel::NONE)
            .expect("compile reparsed");

        prop_assert_eq!(redag.num_qubits(), dag.num_qubits());
        prop_assert_eq!(redag.num_clbits(), dag.num_clbits());
        prop_assert_eq!(op_names(&redag), op_names(&dag));
    }

    /// Emission is deterministic.
    #[test]
    fn emission_is_deterministic(circuit in arb_simple_circuit()) {
        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        let qasm1 = emit(&dag).expect("first emission");
        let qasm2 = emit(&dag).expect("second emission");
        prop_assert_eq!(qasm1, qasm2);
    }

    /// An empty circuit round-trips its registers.
    #[test]
    fn empty_circuit_roundtrip(num_qubits in 1_u32..=8, num_clbits in 0_u32..=8) {
        let circuit = Circuit::with_size("empty", num_qubits, num_clbits);
        let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();

        let qasm = emit(&dag).expect("emit empty");
        let reparsed = parse(&qasm).expect("parse empty");

        prop_assert_eq!(reparsed.num_qubits(), num_qubits as usize);
        prop_assert_eq!(reparsed.num_clbits(), num_clbits as usize);
        prop_assert_eq!(reparsed.instructions().len(), 0);
    }
}

#[test]
fn roundtrip_with_measurement_and_condition() {
    use alsvid_ir::{ClbitId, Comparator, Condition, StandardGate};

    let mut circuit = Circuit::with_size("cond", 2, 2);
    circuit
        .h(QubitId(0))
        .unwrap()
        .measure(QubitId(0), ClbitId(0))
        .unwrap()
        .measure(QubitId(1), ClbitId(1))
        .unwrap()
        .cond_gate(
            StandardGate::X,
            [QubitId(1)],
            Condition::new([ClbitId(0), ClbitId(1)], Comparator::Eq, 1),
        )
        .unwrap();

    let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
    let qasm = emit(&dag).unwrap();
    assert!(qasm.contains("if (c==1) x q[1];"));

    let redag = compile(&parse(&qasm).unwrap(), OptimizationLevel::NONE).unwrap();
    assert_eq!(op_names(&redag), op_names(&dag));
}

#[test]
fn roundtrip_with_custom_gate_definition() {
    use alsvid_ir::{CustomGate, GateFactor, StandardGate};

    let entangle = CustomGate::new("entangle", 2).with_factors(vec![
        GateFactor::standard(StandardGate::H, [0]),
        GateFactor::standard(StandardGate::CX, [0, 1]),
    ]);

    let mut circuit = Circuit::with_size("custom", 3, 0);
    circuit
        .gate(entangle.clone(), [QubitId(0), QubitId(1)])
        .unwrap()
        .gate(entangle, [QubitId(1), QubitId(2)])
        .unwrap();

    let dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
    let qasm = emit(&dag).unwrap();
    assert!(qasm.contains("gate entangle q0, q1 { h q0; cx q0, q1; }"));

    let redag = compile(&parse(&qasm).unwrap(), OptimizationLevel::NONE).unwrap();
    assert_eq!(redag.num_definitions(), dag.num_definitions());
    assert_eq!(op_names(&redag), op_names(&dag));
}
