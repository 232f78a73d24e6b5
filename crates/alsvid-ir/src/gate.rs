//! Quantum gate types.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parameter::ParameterExpression;
use crate::qubit::ClbitId;

/// Standard gates with known semantics.
///
/// This is the compiler's primary (basis) set: anything here can be
/// emitted into the IR directly without further decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate.
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(ParameterExpression),
    /// Controlled rotation around Y.
    CRy(ParameterExpression),
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),
    /// XX rotation gate.
    RXX(ParameterExpression),
    /// YY rotation gate.
    RYY(ParameterExpression),
    /// ZZ rotation gate.
    RZZ(ParameterExpression),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// The QASM-style name and arity of this gate, as one table so the
    /// two can never drift apart.
    fn descriptor(&self) -> (&'static str, u32) {
        match self {
            StandardGate::I => ("id", 1),
            StandardGate::X => ("x", 1),
            StandardGate::Y => ("y", 1),
            StandardGate::Z => ("z", 1),
            StandardGate::H => ("h", 1),
            StandardGate::S => ("s", 1),
            StandardGate::Sdg => ("sdg", 1),
            StandardGate::T => ("t", 1),
            StandardGate::Tdg => ("tdg", 1),
            StandardGate::SX => ("sx", 1),
            StandardGate::SXdg => ("sxdg", 1),
            StandardGate::Rx(_) => ("rx", 1),
            StandardGate::Ry(_) => ("ry", 1),
            StandardGate::Rz(_) => ("rz", 1),
            StandardGate::P(_) => ("p", 1),
            StandardGate::U(_, _, _) => ("u", 1),
            StandardGate::CX => ("cx", 2),
            StandardGate::CY => ("cy", 2),
            StandardGate::CZ => ("cz", 2),
            StandardGate::CH => ("ch", 2),
            StandardGate::Swap => ("swap", 2),
            StandardGate::ISwap => ("iswap", 2),
            StandardGate::CRx(_) => ("crx", 2),
            StandardGate::CRy(_) => ("cry", 2),
            StandardGate::CRz(_) => ("crz", 2),
            StandardGate::CP(_) => ("cp", 2),
            StandardGate::RXX(_) => ("rxx", 2),
            StandardGate::RYY(_) => ("ryy", 2),
            StandardGate::RZZ(_) => ("rzz", 2),
            StandardGate::CCX => ("ccx", 3),
            StandardGate::CSwap => ("cswap", 3),
        }
    }

    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.descriptor().0
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.descriptor().1
    }

    /// Check if this gate has unresolved parameters.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => vec![p],

            StandardGate::U(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }

    /// Check if this gate is its own inverse.
    pub fn is_self_inverse(&self) -> bool {
        matches!(
            self,
            StandardGate::I
                | StandardGate::X
                | StandardGate::Y
                | StandardGate::Z
                | StandardGate::H
                | StandardGate::CX
                | StandardGate::CY
                | StandardGate::CZ
                | StandardGate::CH
                | StandardGate::Swap
                | StandardGate::CCX
                | StandardGate::CSwap
        )
    }
}

/// A quantum gate, either standard or custom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A custom user-defined gate.
    Custom(CustomGate),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Custom(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Custom(g) => g.num_qubits,
        }
    }
}

/// One step of a custom gate's declared decomposition.
///
/// `targets` index into the parent gate's qubit list, so a factor binds to
/// whichever concrete qubits the parent is applied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateFactor {
    /// The sub-gate applied by this step.
    pub gate: GateKind,
    /// Indices into the parent gate's qubit list.
    pub targets: Vec<u32>,
    /// Optional parameter override for the sub-gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<ParameterExpression>,
}

impl GateFactor {
    /// Create a factor applying a standard gate to parent qubit positions.
    pub fn standard(gate: StandardGate, targets: impl IntoIterator<Item = u32>) -> Self {
        Self {
            gate: GateKind::Standard(gate),
            targets: targets.into_iter().collect(),
            param: None,
        }
    }

    /// Create a factor applying a custom gate to parent qubit positions.
    pub fn custom(gate: CustomGate, targets: impl IntoIterator<Item = u32>) -> Self {
        Self {
            gate: GateKind::Custom(gate),
            targets: targets.into_iter().collect(),
            param: None,
        }
    }

    /// Attach a parameter expression to this factor.
    #[must_use]
    pub fn with_param(mut self, param: ParameterExpression) -> Self {
        self.param = Some(param);
        self
    }
}

/// A user-defined or decomposed gate.
///
/// Gates are values: many instructions may reference clones of the same
/// description, and descriptions are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// The name of the gate.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    /// Parameters of the gate.
    pub params: Vec<ParameterExpression>,
    /// Ordered decomposition into sub-gates, if declared.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<GateFactor>,
    /// Optional unitary matrix (row-major, 2^n × 2^n).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Complex64>>,
}

impl CustomGate {
    /// Create a new custom gate.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            params: vec![],
            factors: vec![],
            matrix: None,
        }
    }

    /// Add parameters to the gate.
    #[must_use]
    pub fn with_params(mut self, params: Vec<ParameterExpression>) -> Self {
        self.params = params;
        self
    }

    /// Add a declared decomposition to the gate.
    #[must_use]
    pub fn with_factors(mut self, factors: Vec<GateFactor>) -> Self {
        self.factors = factors;
        self
    }

    /// Add a unitary matrix to the gate.
    ///
    /// # Panics
    ///
    /// Panics if `matrix.len()` does not equal `(2^num_qubits)^2`.
    #[must_use]
    pub fn with_matrix(mut self, matrix: Vec<Complex64>) -> Self {
        let dim = 1usize << self.num_qubits;
        assert_eq!(
            matrix.len(),
            dim * dim,
            "Matrix length {} does not match expected {} for {}-qubit gate",
            matrix.len(),
            dim * dim,
            self.num_qubits,
        );
        self.matrix = Some(matrix);
        self
    }
}

/// Comparison operator for classical conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl Comparator {
    /// Apply the comparison to a register reading.
    #[inline]
    pub fn compare(self, reading: u64, value: u64) -> bool {
        match self {
            Comparator::Eq => reading == value,
            Comparator::Ne => reading != value,
            Comparator::Lt => reading < value,
            Comparator::Le => reading <= value,
            Comparator::Gt => reading > value,
            Comparator::Ge => reading >= value,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

/// Classical condition for conditional operations.
///
/// The referenced bits are read as an integer, bit 0 least significant,
/// and the operation executes only when the comparison holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    /// The classical bits read by the condition, ascending bit order.
    pub clbits: Vec<ClbitId>,
    /// The comparison operator.
    pub cmp: Comparator,
    /// The constant to compare against.
    pub value: u64,
}

impl Condition {
    /// Create a new classical condition.
    pub fn new(clbits: impl IntoIterator<Item = ClbitId>, cmp: Comparator, value: u64) -> Self {
        let mut clbits: Vec<_> = clbits.into_iter().collect();
        clbits.sort_unstable();
        Self { clbits, cmp, value }
    }

    /// Create an equality condition.
    pub fn equals(clbits: impl IntoIterator<Item = ClbitId>, value: u64) -> Self {
        Self::new(clbits, Comparator::Eq, value)
    }

    /// Evaluate the condition against per-bit classical values.
    ///
    /// `read` maps a classical bit to its current value.
    pub fn evaluate(&self, mut read: impl FnMut(ClbitId) -> bool) -> bool {
        let mut reading = 0u64;
        for (pos, &bit) in self.clbits.iter().enumerate() {
            if read(bit) {
                reading |= 1 << pos;
            }
        }
        self.cmp.compare(reading, self.value)
    }
}

impl From<StandardGate> for GateKind {
    fn from(gate: StandardGate) -> Self {
        GateKind::Standard(gate)
    }
}

impl From<CustomGate> for GateKind {
    fn from(gate: CustomGate) -> Self {
        GateKind::Custom(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);

        assert!(!StandardGate::H.is_parameterized());
        assert!(!StandardGate::Rx(ParameterExpression::constant(PI)).is_parameterized());
        assert!(StandardGate::Rx(ParameterExpression::symbol("theta")).is_parameterized());
        assert!(StandardGate::Ry(ParameterExpression::index(0)).is_parameterized());
    }

    #[test]
    fn test_gate_kind_conversions() {
        let h: GateKind = StandardGate::H.into();
        assert_eq!(h.name(), "h");
        assert_eq!(h.num_qubits(), 1);

        let custom: GateKind = CustomGate::new("oracle", 3).into();
        assert_eq!(custom.name(), "oracle");
        assert_eq!(custom.num_qubits(), 3);
    }

    #[test]
    fn test_custom_gate_factors() {
        // swap = cx(0,1) cx(1,0) cx(0,1)
        let swap = CustomGate::new("my_swap", 2).with_factors(vec![
            GateFactor::standard(StandardGate::CX, [0, 1]),
            GateFactor::standard(StandardGate::CX, [1, 0]),
            GateFactor::standard(StandardGate::CX, [0, 1]),
        ]);

        assert_eq!(swap.factors.len(), 3);
        assert_eq!(swap.factors[1].targets, vec![1, 0]);
    }

    #[test]
    fn test_condition_evaluation() {
        // c1 c0 read as an integer, bit 0 least significant
        let cond = Condition::equals([ClbitId(0), ClbitId(1)], 2);
        assert!(cond.evaluate(|bit| bit == ClbitId(1)));
        assert!(!cond.evaluate(|bit| bit == ClbitId(0)));

        let ge = Condition::new([ClbitId(0), ClbitId(1)], Comparator::Ge, 1);
        assert!(ge.evaluate(|_| true));
        assert!(!ge.evaluate(|_| false));
    }
}
