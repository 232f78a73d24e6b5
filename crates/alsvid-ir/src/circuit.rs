//! High-level circuit builder API.
//!
//! A [`Circuit`] is a mutable builder owned by client code: an ordered
//! instruction list plus register allocations and an optional trainable
//! parameter vector. Lowering into the IR graph is the compiler's job; the
//! builder itself never constructs DAG nodes. Wire operands are validated
//! as instructions are appended, so a malformed program fails at the call
//! site instead of deep inside compilation.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{Condition, GateKind, StandardGate};
use crate::instruction::Instruction;
use crate::parameter::ParameterExpression;
use crate::qubit::{ClbitId, QubitId};

/// A declared register in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    /// Register name.
    pub name: String,
    /// First wire index allocated to this register.
    pub start: u32,
    /// Number of wires.
    pub size: u32,
}

/// A quantum circuit under construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Total quantum wires allocated across `qregs`.
    num_qubits: u32,
    /// Total classical wires allocated across `cregs`.
    num_clbits: u32,
    /// Quantum registers, declaration order.
    qregs: Vec<Register>,
    /// Classical registers, declaration order.
    cregs: Vec<Register>,
    /// The instruction sequence.
    instructions: Vec<Instruction>,
    /// Trainable parameter vector referenced by `ParameterExpression::Index`.
    params: Vec<f64>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_qubits: 0,
            num_clbits: 0,
            qregs: vec![],
            cregs: vec![],
            instructions: vec![],
            params: vec![],
        }
    }

    /// Create a circuit with a default register of the given sizes.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        if num_qubits > 0 {
            circuit.add_qreg("q", num_qubits);
        }
        if num_clbits > 0 {
            circuit.add_creg("c", num_clbits);
        }
        circuit
    }

    /// Declare a quantum register, returning the allocated wire ids.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> Vec<QubitId> {
        let start = self.num_qubits;
        self.num_qubits += size;
        self.qregs.push(Register {
            name: name.into(),
            start,
            size,
        });
        (start..start + size).map(QubitId).collect()
    }

    /// Declare a classical register, returning the allocated wire ids.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> Vec<ClbitId> {
        let start = self.num_clbits;
        self.num_clbits += size;
        self.cregs.push(Register {
            name: name.into(),
            start,
            size,
        });
        (start..start + size).map(ClbitId).collect()
    }

    /// Set the trainable parameter vector.
    #[must_use]
    pub fn with_params(mut self, params: Vec<f64>) -> Self {
        self.params = params;
        self
    }

    /// Push a raw instruction without operand validation.
    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    // =========================================================================
    // Validated append path
    // =========================================================================

    fn check_qubit(&self, qubit: QubitId, context: &str) -> IrResult<()> {
        if qubit.0 < self.num_qubits {
            Ok(())
        } else {
            Err(IrError::QubitNotFound {
                qubit,
                context: context.to_string(),
            })
        }
    }

    fn check_clbit(&self, clbit: ClbitId, context: &str) -> IrResult<()> {
        if clbit.0 < self.num_clbits {
            Ok(())
        } else {
            Err(IrError::ClbitNotFound {
                clbit,
                context: context.to_string(),
            })
        }
    }

    /// Validate and build a gate instruction: arity, declared wires, no
    /// repeated operand.
    fn checked_gate(
        &self,
        gate: impl Into<GateKind>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<Instruction> {
        let gate = gate.into();
        let qubits: Vec<QubitId> = qubits.into_iter().collect();

        if gate.num_qubits() as usize != qubits.len() {
            return Err(IrError::QubitCountMismatch {
                gate: gate.name().to_string(),
                expected: gate.num_qubits(),
                got: qubits.len() as u32,
            });
        }
        for (i, &q) in qubits.iter().enumerate() {
            self.check_qubit(q, gate.name())?;
            if qubits[..i].contains(&q) {
                return Err(IrError::DuplicateQubit {
                    qubit: q,
                    context: gate.name().to_string(),
                });
            }
        }
        Ok(Instruction::gate(gate, qubits))
    }

    /// Apply a standard or custom gate.
    pub fn gate(
        &mut self,
        gate: impl Into<GateKind>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        let instruction = self.checked_gate(gate, qubits)?;
        Ok(self.push(instruction))
    }

    /// Apply a gate guarded by a classical condition.
    pub fn cond_gate(
        &mut self,
        gate: impl Into<GateKind>,
        qubits: impl IntoIterator<Item = QubitId>,
        condition: Condition,
    ) -> IrResult<&mut Self> {
        let instruction = self.checked_gate(gate, qubits)?;
        for &bit in &condition.clbits {
            self.check_clbit(bit, instruction.name())?;
        }
        let instruction = instruction.with_condition(condition);
        Ok(self.push(instruction))
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::H, [qubit])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::X, [qubit])
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Y, [qubit])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Z, [qubit])
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::S, [qubit])
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Sdg, [qubit])
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::T, [qubit])
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Tdg, [qubit])
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::SX, [qubit])
    }

    /// Apply Rx rotation gate.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::Rx(theta.into()), [qubit])
    }

    /// Apply Ry rotation gate.
    pub fn ry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::Ry(theta.into()), [qubit])
    }

    /// Apply Rz rotation gate.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::Rz(theta.into()), [qubit])
    }

    /// Apply phase gate.
    pub fn p(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::P(theta.into()), [qubit])
    }

    /// Apply universal U gate.
    pub fn u(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.gate(
            StandardGate::U(theta.into(), phi.into(), lambda.into()),
            [qubit],
        )
    }

    // =========================================================================
    // Multi-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CX, [control, target])
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CY, [control, target])
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CZ, [control, target])
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Swap, [q1, q2])
    }

    /// Apply controlled-phase gate.
    pub fn cp(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::CP(theta.into()), [control, target])
    }

    /// Apply controlled-Rz gate.
    pub fn crz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::CRz(theta.into()), [control, target])
    }

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CCX, [c1, c2, target])
    }

    /// Apply Fredkin (CSWAP) gate.
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CSwap, [control, t1, t2])
    }

    // =========================================================================
    // Non-gate operations
    // =========================================================================

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.check_qubit(qubit, "measure")?;
        self.check_clbit(clbit, "measure")?;
        Ok(self.push(Instruction::measure(qubit, clbit)))
    }

    /// Measure every qubit to a matching classical bit, allocating a
    /// `meas` register if the circuit does not have enough.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        if self.num_clbits < self.num_qubits {
            let missing = self.num_qubits - self.num_clbits;
            self.add_creg("meas", missing);
        }
        let qubits = (0..self.num_qubits).map(QubitId);
        let clbits = (0..self.num_qubits).map(ClbitId);
        let instruction = Instruction::measure_all(qubits, clbits)?;
        Ok(self.push(instruction))
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.check_qubit(qubit, "reset")?;
        Ok(self.push(Instruction::reset(qubit)))
    }

    /// Apply a barrier to the given qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        let qubits: Vec<QubitId> = qubits.into_iter().collect();
        for &q in &qubits {
            self.check_qubit(q, "barrier")?;
        }
        Ok(self.push(Instruction::barrier(qubits)))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits as usize
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits as usize
    }

    /// Get the instruction sequence.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Get the quantum registers in declaration order.
    pub fn qregs(&self) -> &[Register] {
        &self.qregs
    }

    /// Get the classical registers in declaration order.
    pub fn cregs(&self) -> &[Register] {
        &self.cregs
    }

    /// Get the trainable parameter vector.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Get a mutable reference to the trainable parameter vector.
    pub fn params_mut(&mut self) -> &mut Vec<f64> {
        &mut self.params
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit
            .h(QubitId(0))?
            .cx(QubitId(0), QubitId(1))?
            .measure(QubitId(0), ClbitId(0))?
            .measure(QubitId(1), ClbitId(1))?;
        Ok(circuit)
    }

    /// Create a GHZ state circuit.
    pub fn ghz(n: u32) -> IrResult<Self> {
        if n == 0 {
            return Ok(Self::new("ghz_0"));
        }
        let mut circuit = Self::with_size("ghz", n, n);
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        for i in 0..n {
            circuit.measure(QubitId(i), ClbitId(i))?;
        }
        Ok(circuit)
    }

    /// Create a QFT circuit (without measurements).
    pub fn qft(n: u32) -> IrResult<Self> {
        use std::f64::consts::PI;

        if n == 0 {
            return Ok(Self::new("qft_0"));
        }
        let mut circuit = Self::with_size("qft", n, 0);
        for i in 0..n {
            circuit.h(QubitId(i))?;
            for j in (i + 1)..n {
                let k = j - i;
                let angle = PI / f64::from(1u32 << k);
                circuit.cp(angle, QubitId(j), QubitId(i))?;
            }
        }
        for i in 0..n / 2 {
            circuit.swap(QubitId(i), QubitId(n - 1 - i))?;
        }
        Ok(circuit)
    }
}
