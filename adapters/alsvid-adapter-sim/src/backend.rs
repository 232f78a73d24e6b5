//! Simulator backend implementation.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use alsvid_hal::{Backend, Counts, ExecutionResult, HalError, HalResult, RunConfig};
use alsvid_ir::{Condition, Dag, DagNode, OpKind, StandardGate};
use rustc_hash::FxHashMap;

use crate::statevector::Statevector;

/// One flattened execution step, with callers already inlined.
enum SimStep {
    Gate {
        gate: StandardGate,
        qubits: Vec<usize>,
        condition: Option<Condition>,
    },
    Dense {
        matrix: Vec<Complex64>,
        qubits: Vec<usize>,
        controls: usize,
        inverse: bool,
        condition: Option<Condition>,
    },
    Measure {
        qubit: usize,
        clbit: usize,
        condition: Option<Condition>,
    },
    Reset {
        qubit: usize,
        condition: Option<Condition>,
    },
}

impl SimStep {
    fn condition(&self) -> Option<&Condition> {
        match self {
            SimStep::Gate { condition, .. }
            | SimStep::Dense { condition, .. }
            | SimStep::Measure { condition, .. }
            | SimStep::Reset { condition, .. } => condition.as_ref(),
        }
    }
}

/// Local state-vector simulator backend.
///
/// Simulates an assembled IR exactly, limited by memory to roughly 20-25
/// qubits. Circuits without measurements or conditions are run once and
/// sampled from the exact final distribution; anything with mid-circuit
/// collapse runs shot by shot.
pub struct SimulatorBackend {
    name: String,
    max_qubits: u32,
}

impl SimulatorBackend {
    /// Create a new simulator backend with default settings.
    pub fn new() -> Self {
        Self::with_max_qubits(20)
    }

    /// Create a simulator with a custom qubit limit.
    pub fn with_max_qubits(max_qubits: u32) -> Self {
        Self {
            name: "simulator".into(),
            max_qubits,
        }
    }

    /// Flatten the IR into executable steps, inlining callers through
    /// their definitions.
    fn flatten(dag: &Dag) -> Vec<SimStep> {
        let mut steps = vec![];
        for (_, node) in dag.topological_ops() {
            match node {
                DagNode::Op(op) => match &op.kind {
                    OpKind::Gate(gate) => steps.push(SimStep::Gate {
                        gate: gate.clone(),
                        qubits: op.qubits.iter().map(|q| q.index()).collect(),
                        condition: op.condition.clone(),
                    }),
                    OpKind::Measure => {
                        for (q, c) in op.qubits.iter().zip(&op.clbits) {
                            steps.push(SimStep::Measure {
                                qubit: q.index(),
                                clbit: c.index(),
                                condition: op.condition.clone(),
                            });
                        }
                    }
                    OpKind::Reset => {
                        for q in &op.qubits {
                            steps.push(SimStep::Reset {
                                qubit: q.index(),
                                condition: op.condition.clone(),
                            });
                        }
                    }
                    OpKind::Barrier => {}
                },
                DagNode::Caller(caller) => {
                    for callee in dag.callees(caller.def) {
                        let qubits = callee
                            .positions
                            .iter()
                            .map(|&p| caller.qubits[p as usize].index())
                            .collect();
                        steps.push(SimStep::Gate {
                            gate: callee.gate.clone(),
                            qubits,
                            condition: caller.condition.clone(),
                        });
                    }
                }
                DagNode::Unitary(u) => steps.push(SimStep::Dense {
                    matrix: u.matrix.clone(),
                    qubits: u.qubits.iter().map(|q| q.index()).collect(),
                    controls: u.controls as usize,
                    inverse: u.inverse,
                    condition: u.condition.clone(),
                }),
                _ => {}
            }
        }
        steps
    }

    /// Exact single-pass execution: final state, exact probabilities over
    /// the readout qubits, counts sampled from the distribution.
    fn run_exact(
        &self,
        steps: &[SimStep],
        num_qubits: usize,
        readout: &[usize],
        shots: u32,
        rng: &mut impl Rng,
    ) -> ExecutionResult {
        let mut sv = Statevector::new(num_qubits);
        for step in steps {
            match step {
                SimStep::Gate { gate, qubits, .. } => sv.apply_standard(gate, qubits),
                SimStep::Dense {
                    matrix,
                    qubits,
                    controls,
                    inverse,
                    ..
                } => sv.apply_dense(matrix, qubits, *controls, *inverse),
                // The exact path is only taken for collapse-free programs.
                SimStep::Measure { .. } | SimStep::Reset { .. } => unreachable!(),
            }
        }

        // Marginalize the basis-state distribution onto the readout bits.
        let mut probabilities: FxHashMap<String, f64> = FxHashMap::default();
        for (state, p) in sv.probabilities().into_iter().enumerate() {
            if p == 0.0 {
                continue;
            }
            *probabilities
                .entry(readout_bitstring(state, readout))
                .or_default() += p;
        }

        let mut counts = Counts::new();
        for _ in 0..shots {
            let state = sv.sample(rng);
            counts.insert(readout_bitstring(state, readout), 1);
        }

        ExecutionResult::from_counts(counts, shots)
            .with_probabilities(probabilities)
            .with_states(sv.amplitudes().to_vec())
    }

    /// Shot-by-shot execution with mid-circuit collapse and classical
    /// conditions evaluated against the per-shot register state.
    fn run_shots(
        &self,
        steps: &[SimStep],
        num_qubits: usize,
        num_clbits: usize,
        readout: Option<&[usize]>,
        shots: u32,
        rng: &mut impl Rng,
    ) -> ExecutionResult {
        let mut counts = Counts::new();
        let has_measure = steps
            .iter()
            .any(|s| matches!(s, SimStep::Measure { .. }));

        for _ in 0..shots {
            let mut sv = Statevector::new(num_qubits);
            let mut classical = vec![false; num_clbits];

            for step in steps {
                if let Some(cond) = step.condition() {
                    let holds = cond.evaluate(|bit| classical[bit.index()]);
                    if !holds {
                        continue;
                    }
                }
                match step {
                    SimStep::Gate { gate, qubits, .. } => sv.apply_standard(gate, qubits),
                    SimStep::Dense {
                        matrix,
                        qubits,
                        controls,
                        inverse,
                        ..
                    } => sv.apply_dense(matrix, qubits, *controls, *inverse),
                    SimStep::Measure { qubit, clbit, .. } => {
                        classical[*clbit] = sv.measure(*qubit, rng);
                    }
                    SimStep::Reset { qubit, .. } => sv.reset(*qubit, rng),
                }
            }

            let bitstring = match readout {
                // Explicit readout qubits: measure them after the program.
                Some(qubits) => {
                    let outcomes: Vec<bool> =
                        qubits.iter().map(|&q| sv.measure(q, rng)).collect();
                    outcomes
                        .iter()
                        .rev()
                        .map(|&b| if b { '1' } else { '0' })
                        .collect()
                }
                // Otherwise read the classical register written by the
                // program's own measurements, or sample everything.
                None if has_measure => classical
                    .iter()
                    .rev()
                    .map(|&b| if b { '1' } else { '0' })
                    .collect(),
                None => {
                    let state = sv.sample(rng);
                    sv.outcome_to_bitstring(state)
                }
            };
            counts.insert(bitstring, 1);
        }

        ExecutionResult::from_counts(counts, shots)
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a basis-state index as a readout string over selected qubits,
/// rightmost character = first readout qubit.
fn readout_bitstring(state: usize, readout: &[usize]) -> String {
    readout
        .iter()
        .rev()
        .map(|&q| if state & (1 << q) != 0 { '1' } else { '0' })
        .collect()
}

impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.name
    }

    /// The simulator's native set is the full standard set, so assembly
    /// only validates: qubit count within the memory limit, every gate
    /// parameter concrete.
    fn assemble(&self, dag: &mut Dag) -> HalResult<()> {
        if dag.num_qubits() > self.max_qubits as usize {
            return Err(HalError::Validation(format!(
                "circuit has {} qubits but the simulator supports at most {}",
                dag.num_qubits(),
                self.max_qubits
            )));
        }

        for (_, node) in dag.topological_ops() {
            match node {
                DagNode::Op(op) => {
                    if let OpKind::Gate(gate) = &op.kind {
                        if gate.is_parameterized() {
                            return Err(HalError::Validation(format!(
                                "gate '{}' has unresolved symbolic parameters",
                                gate.name()
                            )));
                        }
                    }
                }
                DagNode::Caller(caller) => {
                    for callee in dag.callees(caller.def) {
                        if callee.gate.is_parameterized() {
                            return Err(HalError::Validation(format!(
                                "gate '{}' has unresolved symbolic parameters",
                                callee.gate.name()
                            )));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    #[instrument(skip(self, dag, config))]
    fn execute(&self, dag: &Dag, config: &RunConfig) -> HalResult<ExecutionResult> {
        let num_qubits = dag.num_qubits();
        let num_clbits = dag.num_clbits();
        if num_qubits > self.max_qubits as usize {
            return Err(HalError::Validation(format!(
                "circuit has {num_qubits} qubits but the simulator supports at most {}",
                self.max_qubits
            )));
        }

        let steps = Self::flatten(dag);
        debug!(
            "simulating {} steps over {} qubits, {} shots",
            steps.len(),
            num_qubits,
            config.shots
        );

        let mut rng = StdRng::from_entropy();
        let collapse_free = steps.iter().all(|s| {
            !matches!(s, SimStep::Measure { .. } | SimStep::Reset { .. })
                && s.condition().is_none()
        });

        let readout_qubits: Option<Vec<usize>> = config
            .measure_qubits
            .as_ref()
            .map(|qs| qs.iter().map(|&q| q as usize).collect());

        let result = if collapse_free {
            let all: Vec<usize> = (0..num_qubits).collect();
            let readout = readout_qubits.as_deref().unwrap_or(&all);
            self.run_exact(&steps, num_qubits, readout, config.shots, &mut rng)
        } else {
            self.run_shots(
                &steps,
                num_qubits,
                num_clbits,
                readout_qubits.as_deref(),
                config.shots,
                &mut rng,
            )
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_compile::{OptimizationLevel, compile};
    use alsvid_ir::{Circuit, ClbitId, Comparator, ParameterExpression, QubitId};

    fn run(circuit: &Circuit, shots: u32) -> ExecutionResult {
        let backend = SimulatorBackend::new();
        let mut dag = compile(circuit, OptimizationLevel::NONE).unwrap();
        backend.assemble(&mut dag).unwrap();
        backend
            .execute(&dag, &RunConfig::new().configure_shots(shots))
            .unwrap()
    }

    #[test]
    fn test_bell_state_counts() {
        let circuit = Circuit::bell().unwrap();
        let result = run(&circuit, 1000);

        assert_eq!(result.shots, 1000);
        assert_eq!(result.counts.get("00") + result.counts.get("11"), 1000);
        assert_eq!(result.counts.get("01") + result.counts.get("10"), 0);
    }

    #[test]
    fn test_ghz_state_counts() {
        let circuit = Circuit::ghz(3).unwrap();
        let result = run(&circuit, 500);
        assert_eq!(result.counts.get("000") + result.counts.get("111"), 500);
    }

    #[test]
    fn test_exact_probabilities_without_measurement() {
        let mut circuit = Circuit::with_size("plus", 1, 0);
        circuit.h(QubitId(0)).unwrap();

        let result = run(&circuit, 100);
        let states = result.states.expect("collapse-free run keeps the state");
        assert_eq!(states.len(), 2);
        assert!((result.probabilities["0"] - 0.5).abs() < 1e-10);
        assert!((result.probabilities["1"] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_deterministic_x_gate() {
        let mut circuit = Circuit::with_size("one", 2, 2);
        circuit.x(QubitId(0)).unwrap().measure_all().unwrap();

        let result = run(&circuit, 64);
        // Qubit 0 measured 1, qubit 1 measured 0 → rightmost bit is 1.
        assert_eq!(result.counts.get("01"), 64);
    }

    #[test]
    fn test_conditioned_gate_fires_on_register() {
        // Measure a |1⟩ qubit, then conditionally flip another.
        let mut circuit = Circuit::with_size("cond", 2, 2);
        circuit
            .x(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .cond_gate(
                StandardGate::X,
                [QubitId(1)],
                Condition::new([ClbitId(0)], Comparator::Eq, 1),
            )
            .unwrap()
            .measure(QubitId(1), ClbitId(1))
            .unwrap();

        let result = run(&circuit, 50);
        assert_eq!(result.counts.get("11"), 50);
    }

    #[test]
    fn test_conditioned_gate_skipped_when_false() {
        let mut circuit = Circuit::with_size("cond0", 2, 2);
        circuit
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .cond_gate(
                StandardGate::X,
                [QubitId(1)],
                Condition::new([ClbitId(0)], Comparator::Eq, 1),
            )
            .unwrap()
            .measure(QubitId(1), ClbitId(1))
            .unwrap();

        let result = run(&circuit, 50);
        assert_eq!(result.counts.get("00"), 50);
    }

    #[test]
    fn test_custom_gate_inlined_through_definition() {
        use alsvid_ir::{CustomGate, GateFactor};

        let bellpair = CustomGate::new("bellpair", 2).with_factors(vec![
            GateFactor::standard(StandardGate::H, [0]),
            GateFactor::standard(StandardGate::CX, [0, 1]),
        ]);

        let mut circuit = Circuit::with_size("c", 2, 2);
        circuit
            .gate(bellpair, [QubitId(0), QubitId(1)])
            .unwrap()
            .measure_all()
            .unwrap();

        let result = run(&circuit, 400);
        assert_eq!(result.counts.get("00") + result.counts.get("11"), 400);
    }

    #[test]
    fn test_reset_mid_circuit() {
        let mut circuit = Circuit::with_size("r", 1, 1);
        circuit
            .h(QubitId(0))
            .unwrap()
            .reset(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap();

        let result = run(&circuit, 80);
        assert_eq!(result.counts.get("0"), 80);
    }

    #[test]
    fn test_measure_qubits_config() {
        let mut circuit = Circuit::with_size("sel", 2, 0);
        circuit.x(QubitId(1)).unwrap();

        let backend = SimulatorBackend::new();
        let mut dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        backend.assemble(&mut dag).unwrap();
        let result = backend
            .execute(
                &dag,
                &RunConfig::new()
                    .configure_shots(32)
                    .configure_measure_qubits([1]),
            )
            .unwrap();

        assert_eq!(result.counts.get("1"), 32);
    }

    #[test]
    fn test_assemble_rejects_oversized() {
        let backend = SimulatorBackend::with_max_qubits(3);
        let circuit = Circuit::with_size("big", 5, 0);
        let mut dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        let err = backend.assemble(&mut dag).unwrap_err();
        assert!(matches!(err, HalError::Validation(_)));
    }

    #[test]
    fn test_assemble_rejects_symbolic_params() {
        let mut circuit = Circuit::with_size("sym", 1, 0);
        circuit
            .rx(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();

        let backend = SimulatorBackend::new();
        let mut dag = compile(&circuit, OptimizationLevel::NONE).unwrap();
        let err = backend.assemble(&mut dag).unwrap_err();
        assert!(matches!(err, HalError::Validation(_)));
    }

    #[test]
    fn test_opaque_unitary_executed() {
        use num_complex::Complex64;

        // A raw X matrix as an opaque 1-qubit unitary... routed through
        // the compiler it becomes ZYZ rotations; exercise the dense path
        // directly through the DAG instead.
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 1);
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        dag.add_unitary(alsvid_ir::UnitaryNode {
            name: "rawx".into(),
            matrix: vec![zero, one, one, zero],
            qubits: vec![QubitId(0)],
            controls: 0,
            inverse: false,
            condition: None,
        })
        .unwrap();

        let backend = SimulatorBackend::new();
        let result = backend
            .execute(&dag, &RunConfig::new().configure_shots(16))
            .unwrap();
        assert_eq!(result.counts.get("1"), 16);
    }
}
