//! Parabolic cylinder function in the form `Psi(z, x) = exp(x^2/4) U(z, -x)`.
//!
//! `Psi` solves `Psi'' = x Psi' + s Psi` with `s = z + 1/2` and behaves as
//! `(-x)^(-s)` for `x -> -inf`. It is evaluated by starting on the far left
//! from the asymptotic series and integrating the ODE to the right with
//! local Taylor expansions. The integration carries `R = Psi - 1` rather than
//! `Psi`, so differences `Psi(z, a) - Psi(z, b)` stay accurate when `s` is
//! close to zero (low frequencies in the transfer function).
//!
//! Values grow like `exp(x^2/2)` for large positive `x` and overflow past
//! `x` of about 37.

use num_complex::Complex64;

/// Relative size below which series terms are dropped.
const TERM_EPS: f64 = 1e-17;
const MAX_TERMS: usize = 400;
/// Largest ODE step, and the step scale `STEP_SCALE / |x|` far from the origin.
const MAX_STEP: f64 = 0.5;
const STEP_SCALE: f64 = 1.5;
const MIN_START: f64 = 10.0;
const MAX_START_GROWTH: usize = 64;

/// `exp(w) - 1` without cancellation for small `w`.
fn exp_m1(w: Complex64) -> Complex64 {
    let (a, b) = (w.re, w.im);
    let half = (0.5 * b).sin();
    Complex64::new(a.exp_m1() * b.cos() - 2.0 * half * half, a.exp() * b.sin())
}

/// Sum of `sum_k (-1)^k (s)_2k / (k! (2 X^2)^k)` minus its leading one, and
/// its derivative in `X`. `None` if the terms start growing before they
/// become negligible.
fn asymptotic_tail(s: Complex64, big_x: f64) -> Option<(Complex64, Complex64)> {
    let two_x2 = 2.0 * big_x * big_x;
    let mut term = Complex64::new(1.0, 0.0);
    let mut tail = Complex64::new(0.0, 0.0);
    let mut d_tail = Complex64::new(0.0, 0.0);
    let mut prev = 1.0;
    for k in 0..MAX_TERMS {
        let kf = k as f64;
        term *= -(s + 2.0 * kf) * (s + 2.0 * kf + 1.0) / ((kf + 1.0) * two_x2);
        let size = term.norm();
        if size > prev {
            return None;
        }
        prev = size;
        tail += term;
        d_tail += term * (-2.0 * (kf + 1.0) / big_x);
        if size <= TERM_EPS * (tail + 1.0).norm() {
            return Some((tail, d_tail));
        }
    }
    None
}

/// Integration state at `x`: offset `Psi - 1` and slope `dPsi/dx`.
#[derive(Debug, Clone, Copy)]
struct State {
    x: f64,
    offset: Complex64,
    slope: Complex64,
}

impl State {
    /// Start at `x = -X` with `X >= start`, growing `X` until the series converges.
    fn asymptotic(s: Complex64, start: f64) -> Option<Self> {
        let mut big_x = start;
        for _ in 0..MAX_START_GROWTH {
            if let Some((tail, d_tail)) = asymptotic_tail(s, big_x) {
                let w = -s * big_x.ln();
                let sum = tail + 1.0;
                let power = w.exp();
                let d_psi_d_big_x = -s / big_x * power * sum + power * d_tail;
                return Some(Self {
                    x: -big_x,
                    offset: exp_m1(w) * sum + tail,
                    slope: -d_psi_d_big_x,
                });
            }
            big_x *= 1.5;
        }
        None
    }

    /// One Taylor step of size `h` of `R'' = x R' + s R + s`.
    fn step(&mut self, s: Complex64, h: f64) {
        let xc = self.x;
        let mut c_prev = self.offset;
        let mut c_cur = self.slope;
        let mut value = self.offset + self.slope * h;
        let mut deriv = self.slope;
        let mut h_pow = h;
        let mut small = 0;
        for n in 0..MAX_TERMS {
            let nf = n as f64;
            let source = if n == 0 { s } else { Complex64::new(0.0, 0.0) };
            let c_next = (c_cur * (xc * (nf + 1.0)) + c_prev * (s + nf) + source)
                / ((nf + 1.0) * (nf + 2.0));
            let h_next = h_pow * h;
            let term = c_next * h_next;
            let d_term = c_next * ((nf + 2.0) * h_pow);
            value += term;
            deriv += d_term;
            c_prev = c_cur;
            c_cur = c_next;
            h_pow = h_next;
            let scale = TERM_EPS * (1.0 + value.norm());
            if term.norm() <= scale && d_term.norm() * h <= scale {
                small += 1;
                if small >= 2 {
                    break;
                }
            } else {
                small = 0;
            }
        }
        self.x += h;
        self.offset = value;
        self.slope = deriv;
    }

    fn advance_to(&mut self, s: Complex64, target: f64) {
        while self.x < target {
            let h = MAX_STEP
                .min(STEP_SCALE / self.x.abs().max(f64::MIN_POSITIVE))
                .min(target - self.x);
            self.step(s, h);
            if target - self.x < 1e-14 {
                self.x = target;
            }
        }
    }
}

/// `Psi(z, x) - 1` for every `x` in `xs`, in input order.
pub fn psi_offsets(z: Complex64, xs: &[f64]) -> Vec<Complex64> {
    let nan = Complex64::new(f64::NAN, f64::NAN);
    let mut out = vec![nan; xs.len()];
    let s = z + 0.5;
    if !(s.re.is_finite() && s.im.is_finite()) {
        return out;
    }
    let mut order: Vec<usize> = (0..xs.len()).filter(|&i| xs[i].is_finite()).collect();
    order.sort_by(|&i, &j| xs[i].total_cmp(&xs[j]));
    let Some(&first) = order.first() else {
        return out;
    };
    let start = MIN_START.max(1.2 * s.norm()).max(1.0 - xs[first]);
    let Some(mut state) = State::asymptotic(s, start) else {
        return out;
    };
    for i in order {
        state.advance_to(s, xs[i]);
        out[i] = state.offset;
    }
    out
}

pub fn psi(z: Complex64, x: f64) -> Complex64 {
    psi_offsets(z, &[x])[0] + 1.0
}

/// `Psi(z, a) - Psi(z, b)`.
pub fn psi_difference(z: Complex64, a: f64, b: f64) -> Complex64 {
    let r = psi_offsets(z, &[a, b]);
    r[0] - r[1]
}

/// `d/dx Psi(z, x) = (1/2 + z) Psi(z + 1, x)`.
pub fn d_psi(z: Complex64, x: f64) -> Complex64 {
    (z + 0.5) * psi(z + 1.0, x)
}

pub fn d_psi_difference(z: Complex64, a: f64, b: f64) -> Complex64 {
    (z + 0.5) * psi_difference(z + 1.0, a, b)
}

/// Second derivative, `(1/2 + z) (3/2 + z) Psi(z + 2, x)`.
pub fn d2_psi(z: Complex64, x: f64) -> Complex64 {
    (z + 0.5) * d_psi(z + 1.0, x)
}

pub fn d2_psi_difference(z: Complex64, a: f64, b: f64) -> Complex64 {
    (z + 0.5) * d_psi_difference(z + 1.0, a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_close(actual: Complex64, expected: Complex64, tol: f64) {
        let err = (actual - expected).norm() / expected.norm();
        assert!(err < tol, "{actual} vs {expected}: relative error {err:e}");
    }

    #[test]
    fn reference_values() {
        assert_close(
            psi(Complex64::new(-0.5, 0.3), 1.2),
            Complex64::new(0.939_955_103_992_816_35, 1.076_571_723_862_811_6),
            1e-11,
        );
        assert_close(
            psi(Complex64::new(0.5, 2.0), -3.0),
            Complex64::new(-0.275_447_439_417_526_94, -0.217_799_366_999_317_88),
            1e-11,
        );
        assert_close(
            psi(Complex64::new(1.5, 10.0), 4.0),
            Complex64::new(281_545_181.790_935_95, -32_122_565.409_354_942),
            1e-10,
        );
        assert_close(
            psi(Complex64::new(-0.5, 25.0), -8.0),
            Complex64::new(-56.601_793_400_945_509, 1.894_535_529_689_333_4),
            1e-10,
        );
    }

    #[test]
    fn order_minus_half_is_constant() {
        // s = 0 gives Psi = 1 everywhere
        let z = Complex64::new(-0.5, 0.0);
        for &x in &[-5.0, 0.0, 3.0] {
            assert_relative_eq!(psi(z, x).re, 1.0, epsilon = 1e-14);
            assert!(psi(z, x).im.abs() < 1e-14);
        }
    }

    #[test]
    fn offsets_keep_input_order() {
        let z = Complex64::new(0.5, 2.0);
        let xs = [1.0, -3.0, 0.5];
        let r = psi_offsets(z, &xs);
        for (x, off) in xs.iter().zip(&r) {
            assert_close(*off + 1.0, psi(z, *x), 1e-12);
        }
    }

    #[test]
    fn derivative_recurrence_matches_finite_difference() {
        let z = Complex64::new(-0.5, 1.7);
        let (x, h) = (0.8, 1e-5);
        let fd = (psi(z, x + h) - psi(z, x - h)) / (2.0 * h);
        assert_close(d_psi(z, x), fd, 1e-7);
        let fd2 = (d_psi(z, x + h) - d_psi(z, x - h)) / (2.0 * h);
        assert_close(d2_psi(z, x), fd2, 1e-7);
    }

    #[test]
    fn differences_stay_accurate_for_small_order() {
        // the difference is O(s) for small s
        let z = Complex64::new(-0.5, 1e-6);
        let d = psi_difference(z, 2.0, -1.0);
        assert!(d.norm() > 0.0 && d.norm() < 1e-4);
        let d_small = psi_difference(Complex64::new(-0.5, 2e-6), 2.0, -1.0);
        assert_relative_eq!(d_small.norm() / d.norm(), 2.0, max_relative = 1e-6);
    }
}
