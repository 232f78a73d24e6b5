//! Statevector simulation engine.
//!
//! Dense amplitude vector over 2^n basis states with bit-mask kernels for
//! every standard gate and a general dense-matrix path for opaque unitary
//! nodes. Bitstring convention: the rightmost bit of a readout corresponds
//! to the lowest-indexed qubit.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::PI;

use alsvid_ir::StandardGate;

/// A statevector representing a pure quantum state.
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Get the amplitude vector.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Per-basis-state outcome probabilities.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Apply a standard gate.
    ///
    /// Gate parameters must already be concrete; the simulator backend
    /// rejects symbolic parameters at assemble time, so an unresolved
    /// angle here leaves the state untouched.
    pub fn apply_standard(&mut self, gate: &StandardGate, qubits: &[usize]) {
        match gate {
            // Single-qubit gates
            StandardGate::I => {}
            StandardGate::X => self.apply_x(qubits[0]),
            StandardGate::Y => self.apply_y(qubits[0]),
            StandardGate::Z => self.apply_z(qubits[0]),
            StandardGate::H => self.apply_h(qubits[0]),
            StandardGate::S => self.apply_phase(qubits[0], PI / 2.0),
            StandardGate::Sdg => self.apply_phase(qubits[0], -PI / 2.0),
            StandardGate::T => self.apply_phase(qubits[0], PI / 4.0),
            StandardGate::Tdg => self.apply_phase(qubits[0], -PI / 4.0),
            StandardGate::SX => self.apply_rx(qubits[0], PI / 2.0),
            StandardGate::SXdg => self.apply_rx(qubits[0], -PI / 2.0),
            StandardGate::Rx(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_rx(qubits[0], t);
                }
            }
            StandardGate::Ry(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_ry(qubits[0], t);
                }
            }
            StandardGate::Rz(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_rz(qubits[0], t);
                }
            }
            StandardGate::P(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_phase(qubits[0], t);
                }
            }
            StandardGate::U(theta, phi, lambda) => {
                if let (Some(t), Some(p), Some(l)) =
                    (theta.as_f64(), phi.as_f64(), lambda.as_f64())
                {
                    self.apply_u(qubits[0], t, p, l);
                }
            }

            // Two-qubit gates
            StandardGate::CX => self.apply_cx(qubits[0], qubits[1]),
            StandardGate::CY => self.apply_cy(qubits[0], qubits[1]),
            StandardGate::CZ => self.apply_cz(qubits[0], qubits[1]),
            StandardGate::CH => self.apply_ch(qubits[0], qubits[1]),
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1]),
            StandardGate::ISwap => self.apply_iswap(qubits[0], qubits[1]),
            StandardGate::CRx(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_crx(qubits[0], qubits[1], t);
                }
            }
            StandardGate::CRy(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_cry(qubits[0], qubits[1], t);
                }
            }
            StandardGate::CRz(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_crz(qubits[0], qubits[1], t);
                }
            }
            StandardGate::CP(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_cp(qubits[0], qubits[1], t);
                }
            }
            StandardGate::RXX(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_rxx(qubits[0], qubits[1], t);
                }
            }
            StandardGate::RYY(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_ryy(qubits[0], qubits[1], t);
                }
            }
            StandardGate::RZZ(theta) => {
                if let Some(t) = theta.as_f64() {
                    self.apply_rzz(qubits[0], qubits[1], t);
                }
            }

            // Three-qubit gates
            StandardGate::CCX => self.apply_ccx(qubits[0], qubits[1], qubits[2]),
            StandardGate::CSwap => self.apply_cswap(qubits[0], qubits[1], qubits[2]),
        }
    }

    // =========================================================================
    // Single-qubit gate implementations
    // =========================================================================

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_z(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    fn apply_h(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = sqrt2_inv * (a + b);
                self.amplitudes[j] = sqrt2_inv * (a - b);
            }
        }
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] *= phase;
            }
        }
    }

    fn apply_rx(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a + neg_i_s * b;
                self.amplitudes[j] = neg_i_s * a + c * b;
            }
        }
    }

    fn apply_ry(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a - s * b;
                self.amplitudes[j] = s * a + c * b;
            }
        }
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                self.amplitudes[i] *= phase_0;
            } else {
                self.amplitudes[i] *= phase_1;
            }
        }
    }

    fn apply_u(&mut self, qubit: usize, theta: f64, phi: f64, lambda: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        let e_il = Complex64::from_polar(1.0, lambda);
        let e_ip = Complex64::from_polar(1.0, phi);
        let e_ipl = Complex64::from_polar(1.0, phi + lambda);

        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a - e_il * s * b;
                self.amplitudes[j] = e_ip * s * a + e_ipl * c * b;
            }
        }
    }

    // =========================================================================
    // Two-qubit gate implementations
    // =========================================================================

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_cy(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_cz(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask != 0) {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    fn apply_ch(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = sqrt2_inv * (a + b);
                self.amplitudes[j] = sqrt2_inv * (a - b);
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..(1 << self.num_qubits) {
            let b1 = (i & mask1) != 0;
            let b2 = (i & mask2) != 0;
            if b1 && !b2 {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_iswap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..(1 << self.num_qubits) {
            let b1 = (i & mask1) != 0;
            let b2 = (i & mask2) != 0;
            if b1 && !b2 {
                let j = (i & !mask1) | mask2;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_crx(&mut self, control: usize, target: usize, theta: f64) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let c = (theta / 2.0).cos();
        let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a + neg_i_s * b;
                self.amplitudes[j] = neg_i_s * a + c * b;
            }
        }
    }

    fn apply_cry(&mut self, control: usize, target: usize, theta: f64) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a - s * b;
                self.amplitudes[j] = s * a + c * b;
            }
        }
    }

    fn apply_crz(&mut self, control: usize, target: usize, theta: f64) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            if i & ctrl_mask != 0 {
                if i & tgt_mask == 0 {
                    self.amplitudes[i] *= phase_0;
                } else {
                    self.amplitudes[i] *= phase_1;
                }
            }
        }
    }

    fn apply_cp(&mut self, control: usize, target: usize, theta: f64) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let phase = Complex64::from_polar(1.0, theta);
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask != 0) {
                self.amplitudes[i] *= phase;
            }
        }
    }

    fn apply_rxx(&mut self, q1: usize, q2: usize, theta: f64) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        let both = mask1 | mask2;
        let high = mask1.max(mask2);
        let c = (theta / 2.0).cos();
        let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
        // Pairs differ in both bits; visiting states with the higher bit
        // clear touches each pair exactly once.
        for i in 0..(1 << self.num_qubits) {
            if i & high == 0 {
                let j = i ^ both;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a + neg_i_s * b;
                self.amplitudes[j] = neg_i_s * a + c * b;
            }
        }
    }

    fn apply_ryy(&mut self, q1: usize, q2: usize, theta: f64) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        let both = mask1 | mask2;
        let high = mask1.max(mask2);
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        // Y⊗Y flips the coupling sign between the equal-bits block (00/11)
        // and the unequal-bits block (01/10).
        for i in 0..(1 << self.num_qubits) {
            if i & high == 0 {
                let j = i ^ both;
                let equal_bits = ((i & mask1) != 0) == ((i & mask2) != 0);
                let coupling = if equal_bits {
                    Complex64::new(0.0, s)
                } else {
                    Complex64::new(0.0, -s)
                };
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a + coupling * b;
                self.amplitudes[j] = coupling * a + c * b;
            }
        }
    }

    fn apply_rzz(&mut self, q1: usize, q2: usize, theta: f64) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        let phase_eq = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_ne = Complex64::from_polar(1.0, theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            let equal_bits = ((i & mask1) != 0) == ((i & mask2) != 0);
            self.amplitudes[i] *= if equal_bits { phase_eq } else { phase_ne };
        }
    }

    // =========================================================================
    // Three-qubit gate implementations
    // =========================================================================

    fn apply_ccx(&mut self, c1: usize, c2: usize, target: usize) {
        let c1_mask = 1 << c1;
        let c2_mask = 1 << c2;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & c1_mask != 0) && (i & c2_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_cswap(&mut self, control: usize, t1: usize, t2: usize) {
        let ctrl_mask = 1 << control;
        let t1_mask = 1 << t1;
        let t2_mask = 1 << t2;
        for i in 0..(1 << self.num_qubits) {
            if i & ctrl_mask != 0 {
                let b1 = (i & t1_mask) != 0;
                let b2 = (i & t2_mask) != 0;
                if b1 && !b2 {
                    let j = (i & !t1_mask) | t2_mask;
                    self.amplitudes.swap(i, j);
                }
            }
        }
    }

    // =========================================================================
    // Dense matrix application
    // =========================================================================

    /// Apply a dense row-major matrix over the base qubits of an opaque
    /// unitary node.
    ///
    /// `qubits` lists `controls` leading control qubits followed by the
    /// base qubits the matrix acts on; bit `t` of the matrix index
    /// corresponds to `qubits[controls + t]`. With `inverse` set the
    /// conjugate transpose is applied instead.
    pub fn apply_dense(
        &mut self,
        matrix: &[Complex64],
        qubits: &[usize],
        controls: usize,
        inverse: bool,
    ) {
        let base = &qubits[controls..];
        let k = base.len();
        let dim = 1usize << k;
        debug_assert_eq!(matrix.len(), dim * dim);

        let ctrl_mask: usize = qubits[..controls].iter().map(|&q| 1 << q).sum();
        let base_mask: usize = base.iter().map(|&q| 1 << q).sum();

        let entry = |r: usize, col: usize| -> Complex64 {
            if inverse {
                matrix[col * dim + r].conj()
            } else {
                matrix[r * dim + col]
            }
        };

        // Scatter a matrix row/column index onto the base qubit positions.
        let expand = |bits: usize| -> usize {
            let mut state = 0usize;
            for (t, &q) in base.iter().enumerate() {
                if bits & (1 << t) != 0 {
                    state |= 1 << q;
                }
            }
            state
        };

        let mut old = vec![Complex64::new(0.0, 0.0); dim];
        for i in 0..(1 << self.num_qubits) {
            // Visit one representative per block: controls all set, base
            // bits all clear.
            if i & ctrl_mask != ctrl_mask || i & base_mask != 0 {
                continue;
            }
            for (col, slot) in old.iter_mut().enumerate() {
                *slot = self.amplitudes[i | expand(col)];
            }
            for r in 0..dim {
                let mut acc = Complex64::new(0.0, 0.0);
                for (col, &amp) in old.iter().enumerate() {
                    acc += entry(r, col) * amp;
                }
                self.amplitudes[i | expand(r)] = acc;
            }
        }
    }

    // =========================================================================
    // Measurement and sampling
    // =========================================================================

    /// Measure one qubit, collapsing the state. Returns the outcome.
    pub fn measure(&mut self, qubit: usize, rng: &mut impl Rng) -> bool {
        let mask = 1 << qubit;
        let prob_one: f64 = self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum();

        let outcome = rng.r#gen::<f64>() < prob_one;
        let keep_mask_set = outcome;
        let norm = if outcome {
            prob_one.sqrt()
        } else {
            (1.0 - prob_one).max(f64::MIN_POSITIVE).sqrt()
        };

        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if ((i & mask != 0) == keep_mask_set) && norm > 0.0 {
                *amp /= norm;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        outcome
    }

    /// Reset one qubit to |0⟩: measure, then flip if the outcome was 1.
    pub fn reset(&mut self, qubit: usize, rng: &mut impl Rng) {
        if self.measure(qubit, rng) {
            self.apply_x(qubit);
        }
    }

    /// Sample a full measurement outcome without collapsing.
    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        let r: f64 = rng.r#gen();
        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }
        self.amplitudes.len() - 1
    }

    /// Render a basis-state index as a bitstring, rightmost bit = qubit 0.
    pub fn outcome_to_bitstring(&self, outcome: usize) -> String {
        format!("{:0width$b}", outcome, width = self.num_qubits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2);
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(1.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn test_bell_state() {
        let mut sv = Statevector::new(2);
        sv.apply_h(0);
        sv.apply_cx(0, 1);

        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(sqrt2_inv, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[2], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(sqrt2_inv, 0.0)));
    }

    #[test]
    fn test_rzz_phases() {
        let theta = 0.7;
        let mut sv = Statevector::new(2);
        // Uniform superposition to expose all four phases.
        sv.apply_h(0);
        sv.apply_h(1);
        sv.apply_rzz(0, 1, theta);

        let eq = Complex64::from_polar(0.5, -theta / 2.0);
        let ne = Complex64::from_polar(0.5, theta / 2.0);
        assert!(approx_eq(sv.amplitudes[0], eq));
        assert!(approx_eq(sv.amplitudes[1], ne));
        assert!(approx_eq(sv.amplitudes[2], ne));
        assert!(approx_eq(sv.amplitudes[3], eq));
    }

    #[test]
    fn test_rxx_on_basis() {
        // RXX(π) maps |00⟩ to -i|11⟩.
        let mut sv = Statevector::new(2);
        sv.apply_rxx(0, 1, PI);
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(0.0, -1.0)));
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn test_ryy_on_basis() {
        // RYY(π) maps |00⟩ to +i|11⟩.
        let mut sv = Statevector::new(2);
        sv.apply_ryy(0, 1, PI);
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(0.0, 1.0)));
    }

    #[test]
    fn test_dense_x_matrix() {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let x = vec![zero, one, one, zero];

        let mut sv = Statevector::new(1);
        sv.apply_dense(&x, &[0], 0, false);
        assert!(approx_eq(sv.amplitudes[1], one));
    }

    #[test]
    fn test_dense_controlled_matrix() {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let x = vec![zero, one, one, zero];

        // Control clear: nothing happens.
        let mut sv = Statevector::new(2);
        sv.apply_dense(&x, &[0, 1], 1, false);
        assert!(approx_eq(sv.amplitudes[0], one));

        // Control set: target flips.
        let mut sv = Statevector::new(2);
        sv.apply_x(0);
        sv.apply_dense(&x, &[0, 1], 1, false);
        assert!(approx_eq(sv.amplitudes[3], one));
    }

    #[test]
    fn test_dense_inverse_is_dagger() {
        let s = vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 1.0),
        ];

        let mut sv = Statevector::new(1);
        sv.apply_h(0);
        sv.apply_dense(&s, &[0], 0, false);
        sv.apply_dense(&s, &[0], 0, true);
        sv.apply_h(0);
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_measure_collapses() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sv = Statevector::new(2);
        sv.apply_h(0);
        sv.apply_cx(0, 1);

        let outcome = sv.measure(0, &mut rng);
        // After measuring one side of a Bell pair the other is determined.
        let other = sv.measure(1, &mut rng);
        assert_eq!(outcome, other);
    }

    #[test]
    fn test_reset_gives_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let mut sv = Statevector::new(1);
            sv.apply_h(0);
            sv.reset(0, &mut rng);
            // Up to a phase the state is |0⟩.
            assert!((sv.amplitudes[0].norm() - 1.0).abs() < 1e-10);
            assert!(sv.amplitudes[1].norm() < 1e-10);
        }
    }

    #[test]
    fn test_sample_deterministic_state() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut sv = Statevector::new(1);
        sv.apply_x(0);

        for _ in 0..50 {
            assert_eq!(sv.sample(&mut rng), 1);
        }
    }

    #[test]
    fn test_bitstring_convention() {
        // Qubit 0 in |1⟩, qubit 1 in |0⟩ reads "01": rightmost bit is the
        // lowest-indexed qubit.
        let sv = Statevector::new(2);
        assert_eq!(sv.outcome_to_bitstring(0b01), "01");
        assert_eq!(sv.outcome_to_bitstring(0b10), "10");
    }
}
