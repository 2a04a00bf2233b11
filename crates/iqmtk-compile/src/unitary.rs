//! 2x2 unitaries and Euler decompositions for single-qubit synthesis.

use num_complex::Complex64;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, PI};

use iqmtk_ir::StandardGate;

/// Tolerance for floating point comparisons.
pub const EPSILON: f64 = 1e-10;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A 2x2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unitary2x2 {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a new 2x2 matrix.
    pub const fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// The identity.
    pub const fn identity() -> Self {
        Self::new(ONE, ZERO, ZERO, ONE)
    }

    /// Diagonal matrix diag(1, e^{iλ}).
    fn phase(lambda: f64) -> Self {
        Self::new(ONE, ZERO, ZERO, Complex64::from_polar(1.0, lambda))
    }

    /// RX rotation.
    pub fn rx(theta: f64) -> Self {
        let (s, c) = (theta / 2.0).sin_cos();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s),
            Complex64::new(0.0, -s),
            Complex64::new(c, 0.0),
        )
    }

    /// RY rotation.
    pub fn ry(theta: f64) -> Self {
        let (s, c) = (theta / 2.0).sin_cos();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// RZ rotation.
    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            ZERO,
            ZERO,
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// PRX(θ, φ) = RZ(φ) · RX(θ) · RZ(−φ).
    pub fn prx(theta: f64, phi: f64) -> Self {
        let (s, c) = (theta / 2.0).sin_cos();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s) * Complex64::from_polar(1.0, -phi),
            Complex64::new(0.0, -s) * Complex64::from_polar(1.0, phi),
            Complex64::new(c, 0.0),
        )
    }

    /// U(θ, φ, λ) = RZ(φ) · RY(θ) · RZ(λ) up to global phase.
    pub fn u(theta: f64, phi: f64, lambda: f64) -> Self {
        let (s, c) = (theta / 2.0).sin_cos();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// The matrix of a bound single-qubit gate.
    ///
    /// Returns `None` for multi-qubit gates and symbolic parameters.
    pub fn from_gate(gate: &StandardGate) -> Option<Self> {
        let s = FRAC_1_SQRT_2;
        let half = Complex64::new(0.5, 0.5);
        let half_conj = Complex64::new(0.5, -0.5);
        let m = match gate {
            StandardGate::I => Self::identity(),
            StandardGate::X => Self::new(ZERO, ONE, ONE, ZERO),
            StandardGate::Y => Self::new(ZERO, -Complex64::i(), Complex64::i(), ZERO),
            StandardGate::Z => Self::phase(PI),
            StandardGate::H => Self::new(
                Complex64::new(s, 0.0),
                Complex64::new(s, 0.0),
                Complex64::new(s, 0.0),
                Complex64::new(-s, 0.0),
            ),
            StandardGate::S => Self::phase(FRAC_PI_2),
            StandardGate::Sdg => Self::phase(-FRAC_PI_2),
            StandardGate::T => Self::phase(PI / 4.0),
            StandardGate::Tdg => Self::phase(-PI / 4.0),
            StandardGate::SX => Self::new(half, half_conj, half_conj, half),
            StandardGate::SXdg => Self::new(half_conj, half, half, half_conj),
            StandardGate::Rx(p) => Self::rx(p.as_f64()?),
            StandardGate::Ry(p) => Self::ry(p.as_f64()?),
            StandardGate::Rz(p) => Self::rz(p.as_f64()?),
            StandardGate::P(p) => Self::phase(p.as_f64()?),
            StandardGate::U(theta, phi, lambda) => {
                Self::u(theta.as_f64()?, phi.as_f64()?, lambda.as_f64()?)
            }
            StandardGate::PRX(theta, phi) => Self::prx(theta.as_f64()?, phi.as_f64()?),
            _ => return None,
        };
        Some(m)
    }

    /// Matrix product `self · other`.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        let [a, b, c, d] = self.data;
        Self::new(a.conj(), c.conj(), b.conj(), d.conj())
    }

    /// Check equality up to a global phase.
    pub fn approx_eq_up_to_phase(&self, other: &Self) -> bool {
        // self · other† is a multiple of the identity iff they agree up to phase.
        let m = self.mul(&other.dagger());
        let [a, b, c, d] = m.data;
        b.norm() < 1e-8 && c.norm() < 1e-8 && (a - d).norm() < 1e-8 && (a.norm() - 1.0).abs() < 1e-8
    }

    /// Check if this is the identity up to global phase.
    pub fn is_identity(&self) -> bool {
        self.approx_eq_up_to_phase(&Self::identity())
    }

    /// Decompose into RZ(α) · RY(β) · RZ(γ) · e^{iδ}.
    ///
    /// Returns `(α, β, γ, δ)` with β in [0, π].
    pub fn zyz_decomposition(&self) -> (f64, f64, f64, f64) {
        let [a, b, c, d] = self.data;
        let det = a * d - b * c;
        let global_phase = det.arg() / 2.0;

        // Strip the phase so the matrix is in SU(2).
        let strip = Complex64::from_polar(1.0, -global_phase);
        let (a, c) = (a * strip, c * strip);

        let beta = 2.0 * c.norm().atan2(a.norm());
        if a.norm() < EPSILON {
            // β = π: only α − γ is determined.
            let alpha_minus_gamma = 2.0 * c.arg();
            return (alpha_minus_gamma, beta, 0.0, global_phase);
        }
        if c.norm() < EPSILON {
            // β = 0: only α + γ is determined.
            let alpha_plus_gamma = -2.0 * a.arg();
            return (alpha_plus_gamma, beta, 0.0, global_phase);
        }
        let alpha_plus_gamma = -2.0 * a.arg();
        let alpha_minus_gamma = 2.0 * c.arg();
        (
            f64::midpoint(alpha_plus_gamma, alpha_minus_gamma),
            beta,
            (alpha_plus_gamma - alpha_minus_gamma) / 2.0,
            global_phase,
        )
    }

    /// Decompose into RZ(a) · RX(b) · RZ(c) up to global phase.
    pub fn zxz_decomposition(&self) -> (f64, f64, f64) {
        let (alpha, beta, gamma, _) = self.zyz_decomposition();
        // RY(β) = RZ(π/2) · RX(β) · RZ(−π/2)
        (alpha + FRAC_PI_2, beta, gamma - FRAC_PI_2)
    }

    /// Normalise an angle to (−π, π].
    pub fn normalize_angle(angle: f64) -> f64 {
        if !angle.is_finite() {
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
