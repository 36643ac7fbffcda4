//! Gauss-Legendre quadrature of `erfcx` with an adaptively chosen order.
//!
//! The Siegert branches integrate `erfcx` over ranges whose length depends on
//! how far threshold and reset sit from the mean input. A fixed-order rule is
//! cheap and vectorizes, but the order needed depends on the range, so it is
//! picked per call: start low and double until the rule agrees with an
//! adaptive Gauss-Kronrod reference of the widest range in the call.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MeanFieldError, MeanFieldResult};
use crate::special::erfcx;

const NEWTON_TOL: f64 = 1e-15;
const NEWTON_MAX_ITER: usize = 100;
const MAX_BISECTIONS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadratureConfig {
    pub start_order: usize,
    pub epsrel: f64,
    /// Number of order doublings before giving up.
    pub max_iterations: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self { start_order: 10, epsrel: 1e-12, max_iterations: 10 }
    }
}

/// Nodes and weights on `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    pub fn new(order: usize) -> Self {
        let n = order.max(1);
        let nf = n as f64;
        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];
        for i in 0..(n + 1) / 2 {
            let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
            let mut dp = 0.0;
            for _ in 0..NEWTON_MAX_ITER {
                let (p, d) = legendre(n, x);
                dp = d;
                let dx = p / d;
                x -= dx;
                if dx.abs() < NEWTON_TOL {
                    dp = legendre(n, x).1;
                    break;
                }
            }
            let w = 2.0 / ((1.0 - x * x) * dp * dp);
            nodes[i] = -x;
            nodes[n - 1 - i] = x;
            weights[i] = w;
            weights[n - 1 - i] = w;
        }
        Self { nodes, weights }
    }

    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Integral of `f` from `a` to `b` (oriented).
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64) -> f64 {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (b + a);
        let sum: f64 = self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * f(half * x + mid))
            .sum();
        half * sum
    }

    pub fn erfcx_integral(&self, a: f64, b: f64) -> f64 {
        self.integrate(erfcx, a, b)
    }
}

/// `P_n(x)` and `P_n'(x)` by the three-term recurrence.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    if n == 0 {
        return (1.0, 0.0);
    }
    let nf = n as f64;
    let dp = nf * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

/// Fixed-order Gauss-Legendre integral of `erfcx` from `a` to `b`.
pub fn erfcx_integral(a: f64, b: f64, order: usize) -> f64 {
    GaussLegendre::new(order).erfcx_integral(a, b)
}

const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.0,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

/// 15-point Kronrod estimate and its distance from the embedded 7-point Gauss rule.
fn kronrod15<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> (f64, f64) {
    let half = 0.5 * (b - a);
    let mid = 0.5 * (b + a);
    let fc = f(mid);
    let mut kronrod = WGK[7] * fc;
    let mut gauss = WG[3] * fc;
    for j in 0..7 {
        let dx = half * XGK[j];
        let pair = f(mid - dx) + f(mid + dx);
        kronrod += WGK[j] * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }
    (kronrod * half, ((kronrod - gauss) * half).abs())
}

/// Globally adaptive Gauss-Kronrod integral with a pure relative tolerance.
pub fn adaptive_integral<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, epsrel: f64) -> f64 {
    let (value, err) = kronrod15(&f, a, b);
    let mut parts = vec![(a, b, value, err)];
    let mut total = value;
    let mut total_err = err;
    for _ in 0..MAX_BISECTIONS {
        if total_err <= epsrel * total.abs() {
            break;
        }
        let worst = parts
            .iter()
            .enumerate()
            .max_by(|x, y| x.1 .3.total_cmp(&y.1 .3))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let (lo, hi, v, e) = parts.swap_remove(worst);
        let m = 0.5 * (lo + hi);
        let (v1, e1) = kronrod15(&f, lo, m);
        let (v2, e2) = kronrod15(&f, m, hi);
        total += v1 + v2 - v;
        total_err += e1 + e2 - e;
        parts.push((lo, m, v1, e1));
        parts.push((m, hi, v2, e2));
    }
    parts.iter().map(|p| p.2).sum()
}

/// Smallest `start_order * 2^k` whose rule reproduces the reference integral
/// of `erfcx` over `[a, b]` to `config.epsrel`.
pub fn find_order(a: f64, b: f64, config: &QuadratureConfig) -> MeanFieldResult<usize> {
    if config.start_order == 0 {
        return Err(MeanFieldError::invalid("start_order", "must be positive"));
    }
    if !(a.is_finite() && b.is_finite()) {
        return Err(MeanFieldError::invalid("integration range", "must be finite"));
    }
    if b <= a {
        // empty range, any order is exact
        return Ok(config.start_order);
    }
    // every order the search may reach has to fit in usize
    (1..config.max_iterations)
        .try_fold(config.start_order, |order, _| order.checked_mul(2))
        .ok_or_else(|| MeanFieldError::invalid("max_iterations", "doubling start_order overflows the quadrature order"))?;
    let reference = adaptive_integral(erfcx, a, b, config.epsrel);
    let mut order = config.start_order;
    let mut rel_error = f64::INFINITY;
    for _ in 0..config.max_iterations {
        rel_error = (erfcx_integral(a, b, order) / reference - 1.0).abs();
        if rel_error < config.epsrel {
            debug!(order, a, b, "gauss-legendre order");
            return Ok(order);
        }
        order = order.saturating_mul(2);
    }
    Err(MeanFieldError::QuadratureConvergence {
        iterations: config.max_iterations,
        rel_error,
    })
}

/// Order for a whole call: the integration range spans the smallest and
/// largest `|y|` over all thresholds and resets.
pub fn find_order_for<'a, I>(ys: I, config: &QuadratureConfig) -> MeanFieldResult<usize>
where
    I: IntoIterator<Item = &'a f64>,
{
    let (a, b) = ys
        .into_iter()
        .map(|y| y.abs())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if a > b {
        return Ok(config.start_order);
    }
    find_order(a, b, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nodes_and_weights_are_symmetric_and_normalized() {
        for order in [1, 2, 5, 10, 40] {
            let rule = GaussLegendre::new(order);
            assert_eq!(rule.order(), order);
            assert_relative_eq!(rule.weights().iter().sum::<f64>(), 2.0, max_relative = 1e-13);
            for i in 0..order {
                assert_relative_eq!(rule.nodes()[i], -rule.nodes()[order - 1 - i], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn exact_for_polynomials_up_to_twice_the_order() {
        let rule = GaussLegendre::new(5);
        // x^9 is odd, x^8 integrates to 2/9 on [-1, 1]
        assert_relative_eq!(rule.integrate(|x| x.powi(8), -1.0, 1.0), 2.0 / 9.0, max_relative = 1e-13);
        assert_relative_eq!(rule.integrate(|x| x.powi(9) + 1.0, 0.0, 2.0), 2.0 + 102.4, max_relative = 1e-13);
    }

    #[test]
    fn erfcx_integral_reference() {
        assert_relative_eq!(erfcx_integral(0.5, 2.0, 40), 0.584_003_842_656_730_12, max_relative = 1e-13);
        assert_relative_eq!(
            adaptive_integral(erfcx, 0.5, 2.0, 1e-12),
            0.584_003_842_656_730_12,
            max_relative = 1e-13
        );
        // orientation
        assert_relative_eq!(erfcx_integral(2.0, 0.5, 40), -0.584_003_842_656_730_12, max_relative = 1e-13);
    }

    #[test]
    fn order_search_is_idempotent() {
        let config = QuadratureConfig::default();
        let first = find_order(0.1, 7.5, &config).unwrap();
        let second = find_order(0.1, 7.5, &config).unwrap();
        assert_eq!(first, second);
        assert!(first >= config.start_order);
        let rel = (erfcx_integral(0.1, 7.5, first) / adaptive_integral(erfcx, 0.1, 7.5, 1e-12) - 1.0).abs();
        assert!(rel < config.epsrel);
    }

    #[test]
    fn order_search_reports_last_error_when_budget_runs_out() {
        let config = QuadratureConfig { start_order: 1, epsrel: 1e-14, max_iterations: 2 };
        match find_order(0.0, 40.0, &config) {
            Err(MeanFieldError::QuadratureConvergence { iterations, rel_error }) => {
                assert_eq!(iterations, 2);
                assert!(rel_error > 1e-14);
            }
            other => panic!("expected convergence failure, got {other:?}"),
        }
    }

    #[test]
    fn order_budget_beyond_usize_is_rejected() {
        let config = QuadratureConfig { start_order: 10, epsrel: 1e-12, max_iterations: 200 };
        assert!(matches!(
            find_order(0.1, 7.5, &config),
            Err(MeanFieldError::InvalidParameter { name: "max_iterations", .. })
        ));
        let widest = QuadratureConfig { start_order: 1, epsrel: 1e-12, max_iterations: usize::BITS as usize };
        assert!(find_order(0.1, 7.5, &widest).is_ok());
    }

    #[test]
    fn empty_range_keeps_start_order() {
        let config = QuadratureConfig::default();
        assert_eq!(find_order(1.3, 1.3, &config).unwrap(), 10);
        assert_eq!(find_order_for(std::iter::empty::<&f64>(), &config).unwrap(), 10);
    }

    #[test]
    fn range_spans_absolute_values() {
        let config = QuadratureConfig::default();
        let ys = [-2.0, 0.5, 1.0];
        assert_eq!(find_order_for(&ys, &config).unwrap(), find_order(0.5, 2.0, &config).unwrap());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: QuadratureConfig = serde_json::from_str(r#"{"epsrel": 1e-10}"#).unwrap();
        assert_eq!(config.start_order, 10);
        assert_eq!(config.epsrel, 1e-10);
    }
}
