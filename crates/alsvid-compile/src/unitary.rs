//! 2×2 unitary matrix utilities.
//!
//! Shared by single-qubit gate synthesis (matrix → ZYZ Euler angles) and
//! the pure-state simplification pass (per-wire state composition).

use num_complex::Complex64;
use std::f64::consts::PI;

use alsvid_ir::StandardGate;

/// Tolerance for floating point comparisons.
const EPSILON: f64 = 1e-10;

/// A 2×2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct Unitary2x2 {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a new 2×2 unitary matrix.
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
        )
    }

    /// Create a Hadamard matrix.
    pub fn h() -> Self {
        let s = 1.0 / 2.0_f64.sqrt();
        Self::new(
            Complex64::new(s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(-s, 0.0),
        )
    }

    /// Create a Pauli-X matrix.
    pub fn x() -> Self {
        Self::new(
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
        )
    }

    /// Create a Pauli-Y matrix.
    pub fn y() -> Self {
        Self::new(
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, -1.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(0.0, 0.0),
        )
    }

    /// Create a Pauli-Z matrix.
    pub fn z() -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(-1.0, 0.0),
        )
    }

    /// Create a diagonal phase matrix diag(1, e^{iθ}).
    pub fn phase(theta: f64) -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::from_polar(1.0, theta),
        )
    }

    /// Create an RX rotation matrix.
    pub fn rx(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s),
            Complex64::new(0.0, -s),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RY rotation matrix.
    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RZ rotation matrix.
    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// Create a U gate U(theta, phi, lambda).
    pub fn u(theta: f64, phi: f64, lambda: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// The matrix of a single-qubit standard gate, if its parameters are
    /// concrete after evaluation against `params`.
    pub fn from_standard_gate(gate: &StandardGate, params: &[f64]) -> Option<Self> {
        match gate {
            StandardGate::I => Some(Self::identity()),
            StandardGate::X => Some(Self::x()),
            StandardGate::Y => Some(Self::y()),
            StandardGate::Z => Some(Self::z()),
            StandardGate::H => Some(Self::h()),
            StandardGate::S => Some(Self::phase(PI / 2.0)),
            StandardGate::Sdg => Some(Self::phase(-PI / 2.0)),
            StandardGate::T => Some(Self::phase(PI / 4.0)),
            StandardGate::Tdg => Some(Self::phase(-PI / 4.0)),
            StandardGate::SX => Some(Self::rx(PI / 2.0)),
            StandardGate::SXdg => Some(Self::rx(-PI / 2.0)),
            StandardGate::Rx(p) => p.evaluate(params).map(Self::rx),
            StandardGate::Ry(p) => p.evaluate(params).map(Self::ry),
            StandardGate::Rz(p) => p.evaluate(params).map(Self::rz),
            StandardGate::P(p) => p.evaluate(params).map(Self::phase),
            StandardGate::U(t, p, l) => Some(Self::u(
                t.evaluate(params)?,
                p.evaluate(params)?,
                l.evaluate(params)?,
            )),
            _ => None, // Multi-qubit gates
        }
    }

    /// Multiply this matrix by another: self * other.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Get the conjugate transpose (dagger).
    pub fn dagger(&self) -> Self {
        Self::new(
            self.data[0].conj(),
            self.data[2].conj(),
            self.data[1].conj(),
            self.data[3].conj(),
        )
    }

    /// The state this unitary prepares from |0⟩ (its first column).
    pub fn prepared_state(&self) -> (Complex64, Complex64) {
        (self.data[0], self.data[2])
    }

    /// Check if this is approximately identity (up to global phase).
    pub fn is_identity(&self) -> bool {
        let [a, b, c, d] = self.data;
        if b.norm() > EPSILON || c.norm() > EPSILON {
            return false;
        }
        (a - d).norm() < EPSILON
    }

    /// Check equality with another unitary up to a global phase factor.
    pub fn approx_eq_up_to_phase(&self, other: &Self, tol: f64) -> bool {
        // Find a reference element with usable magnitude to extract the
        // relative phase.
        let mut phase = None;
        for i in 0..4 {
            if other.data[i].norm() > 1e-6 {
                phase = Some(self.data[i] / other.data[i]);
                break;
            }
        }
        let Some(phase) = phase else {
            return false;
        };
        if (phase.norm() - 1.0).abs() > tol {
            return false;
        }
        (0..4).all(|i| (self.data[i] - phase * other.data[i]).norm() < tol)
    }

    /// Decompose into RZ(alpha) · RY(beta) · RZ(gamma) and a global phase.
    ///
    /// Returns (alpha, beta, gamma, `global_phase`) — the ZYZ Euler
    /// decomposition.
    pub fn zyz_decomposition(&self) -> (f64, f64, f64, f64) {
        let [a, b, c, d] = self.data;

        let det = a * d - b * c;
        let global_phase = det.arg() / 2.0;

        // Remove global phase to get an SU(2) matrix.
        let phase_factor = Complex64::from_polar(1.0, -global_phase);
        let a = a * phase_factor;
        let b = b * phase_factor;
        let c = c * phase_factor;

        // For SU(2): U = [[cos(β/2)·e^{-i(α+γ)/2}, -sin(β/2)·e^{-i(α-γ)/2}],
        //                 [sin(β/2)·e^{ i(α-γ)/2},  cos(β/2)·e^{ i(α+γ)/2}]]
        let beta = 2.0 * a.norm().clamp(0.0, 1.0).acos();

        if beta.abs() < EPSILON {
            // Pure Z rotation.
            let alpha_plus_gamma = -2.0 * a.arg();
            return (
                alpha_plus_gamma / 2.0,
                0.0,
                alpha_plus_gamma / 2.0,
                global_phase,
            );
        }

        if (beta - PI).abs() < EPSILON {
            let alpha_minus_gamma = -2.0 * (-b).arg();
            return (
                alpha_minus_gamma / 2.0,
                PI,
                -alpha_minus_gamma / 2.0,
                global_phase,
            );
        }

        let alpha_plus_gamma = -2.0 * a.arg();
        let alpha_minus_gamma = 2.0 * c.arg();

        let alpha = (alpha_plus_gamma + alpha_minus_gamma) / 2.0;
        let gamma = (alpha_plus_gamma - alpha_minus_gamma) / 2.0;

        (alpha, beta, gamma, global_phase)
    }

    /// Normalize an angle to [-π, π].
    pub fn normalize_angle(angle: f64) -> f64 {
        if angle.is_nan() || angle.is_infinite() {
            return 0.0;
        }
        let mut a = angle.rem_euclid(2.0 * PI);
        if a > PI {
            a -= 2.0 * PI;
        }
        a
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Unitary2x2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert!(Unitary2x2::identity().is_identity());
    }

    #[test]
    fn test_hadamard_squared() {
        let h = Unitary2x2::h();
        assert!((h * h).is_identity());
    }

    #[test]
    fn test_pauli_squared() {
        for m in [Unitary2x2::x(), Unitary2x2::y(), Unitary2x2::z()] {
            assert!((m * m).is_identity());
        }
    }

    #[test]
    fn test_s_squared_is_z() {
        let s = Unitary2x2::phase(PI / 2.0);
        assert!((s * s).approx_eq_up_to_phase(&Unitary2x2::z(), 1e-10));
    }

    #[test]
    fn test_zyz_reconstruction() {
        for m in [
            Unitary2x2::h(),
            Unitary2x2::x(),
            Unitary2x2::rx(0.7),
            Unitary2x2::ry(-1.3),
            Unitary2x2::u(0.3, 1.1, -2.2),
        ] {
            let (alpha, beta, gamma, phase) = m.zyz_decomposition();
            let rebuilt = Unitary2x2::rz(alpha) * Unitary2x2::ry(beta) * Unitary2x2::rz(gamma);
            let global = Complex64::from_polar(1.0, phase);
            for i in 0..4 {
                assert!(
                    (m.data[i] - rebuilt.data[i] * global).norm() < 1e-6,
                    "mismatch at element {i}"
                );
            }
        }
    }

    #[test]
    fn test_prepared_state() {
        let (a, b) = Unitary2x2::h().prepared_state();
        let s = 1.0 / 2.0_f64.sqrt();
        assert!((a - Complex64::new(s, 0.0)).norm() < 1e-12);
        assert!((b - Complex64::new(s, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((Unitary2x2::normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((Unitary2x2::normalize_angle(-3.0 * PI) - PI).abs() < 1e-12);
        assert_eq!(Unitary2x2::normalize_angle(f64::NAN), 0.0);
    }
}
