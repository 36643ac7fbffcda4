//! Real special functions used by the rate and derivative engines.
//!
//! Everything is expressed through the Faddeeva function so that large
//! arguments never form `exp(x^2)` and `erfc(x)` separately.

use std::f64::consts::{FRAC_1_SQRT_2, PI, SQRT_2};

use ndarray::{Array, Dimension};
use num_complex::Complex64;

use crate::error::{MeanFieldError, MeanFieldResult};
use crate::faddeeva::faddeeva;

/// sqrt(pi / 2)
const SQRT_HALF_PI: f64 = 1.253_314_137_315_500_3;

/// Below this argument erfcx(x) = 2 exp(x^2) - erfcx(-x) overflows.
const ERFCX_OVERFLOW: f64 = -26.7;

pub fn erf(x: f64) -> f64 {
    statrs::function::erf::erf(x)
}

pub fn erfc(x: f64) -> f64 {
    statrs::function::erf::erfc(x)
}

/// Scaled complementary error function `exp(x^2) erfc(x)`.
pub fn erfcx(x: f64) -> f64 {
    if x < ERFCX_OVERFLOW {
        return f64::INFINITY;
    }
    faddeeva(Complex64::new(0.0, x)).re
}

/// Dawson integral `sqrt(pi)/2 exp(-x^2) erfi(x)`.
pub fn dawson(x: f64) -> f64 {
    0.5 * PI.sqrt() * faddeeva(Complex64::new(x, 0.0)).im
}

pub fn erfcx_array<D: Dimension>(x: &Array<f64, D>) -> Array<f64, D> {
    x.mapv(erfcx)
}

pub fn dawson_array<D: Dimension>(x: &Array<f64, D>) -> Array<f64, D> {
    x.mapv(dawson)
}

/// `Phi(s) = sqrt(pi/2) exp(s^2/2) (1 + erf(s/sqrt 2))`.
pub fn phi(s: f64) -> f64 {
    SQRT_HALF_PI * erfcx(-s * FRAC_1_SQRT_2)
}

/// `Phi(s) exp(-s^2/2)` for negative `s`, finite for any magnitude.
pub(crate) fn phi_neg(s: f64) -> f64 {
    SQRT_HALF_PI * erfcx(s.abs() * FRAC_1_SQRT_2)
}

/// `Phi(s) exp(-s^2/2)` for positive `s`.
pub(crate) fn phi_pos(s: f64) -> f64 {
    SQRT_HALF_PI * (2.0 - (-0.5 * s * s).exp() * erfcx(s * FRAC_1_SQRT_2))
}

/// Derivative of `Phi(s)` with respect to the mean input, where `s` is a
/// shifted coordinate scaled by `sigma`.
pub fn d_phi_dmu(s: f64, sigma: f64) -> MeanFieldResult<f64> {
    if sigma == 0.0 {
        return Err(MeanFieldError::DivisionByZero { name: "sigma" });
    }
    if sigma < 0.0 {
        return Err(MeanFieldError::invalid("sigma", "must be positive"));
    }
    Ok(-SQRT_2 / sigma * (s * phi(s) + 1.0))
}
