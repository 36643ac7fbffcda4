//! Derivative of the stationary firing rate with respect to the mean input.
//!
//! This is the zero-frequency limit of the transfer function.

use std::f64::consts::{PI, SQRT_2};

use ndarray::Array1;

use crate::colored::{shifted_populations, Method, ALPHA, TAYLOR_X_TH_LIMIT};
use crate::error::MeanFieldResult;
use crate::params::Populations;
use crate::quadrature::QuadratureConfig;
use crate::siegert::delta_firing_rates;
use crate::special::{d_phi_dmu, erfcx, phi};

fn delta_derivative_from_rate(nu: f64, tau_m: f64, sigma: f64, y_th: f64, y_r: f64) -> f64 {
    if nu == 0.0 {
        return 0.0;
    }
    PI.sqrt() * tau_m * nu * nu / sigma * (erfcx(-y_th) - erfcx(-y_r))
}

/// `d nu / d mu` for delta-shaped synaptic currents, in Hz/V.
pub fn delta_derivative(pops: &Populations, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    let nu = delta_firing_rates(pops, config)?;
    let y_th = pops.y_th();
    let y_r = pops.y_r();
    Ok((0..pops.len())
        .map(|i| delta_derivative_from_rate(nu[i], pops.tau_m[i], pops.sigma[i], y_th[i], y_r[i]))
        .collect())
}

/// `d nu / d mu` of the Taylor-method rate (Schuecker et al. 2015, appendix B).
pub fn taylor_derivative(pops: &Populations, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    let nu0 = delta_firing_rates(pops, config)?;
    let y_th = pops.y_th();
    let y_r = pops.y_r();
    let mut out = Array1::zeros(pops.len());
    for i in 0..pops.len() {
        let (tau_m, sigma) = (pops.tau_m[i], pops.sigma[i]);
        let dnu_dmu = delta_derivative_from_rate(nu0[i], tau_m, sigma, y_th[i], y_r[i]);
        let x_th = SQRT_2 * y_th[i];
        let x_r = SQRT_2 * y_r[i];
        if x_th > TAYLOR_X_TH_LIMIT {
            out[i] = dnu_dmu;
            continue;
        }
        let integral = 1.0 / (tau_m * nu0[i]);
        let prefactor = (pops.tau_s[i] / tau_m).sqrt() * ALPHA / (tau_m * SQRT_2);
        let d_phi_prime = d_phi_dmu(x_th, sigma)? - d_phi_dmu(x_r, sigma)?;
        let d_phi = phi(x_th) - phi(x_r);
        let correction = d_phi_prime * integral + 2.0 * SQRT_2 / sigma * d_phi * d_phi;
        out[i] = dnu_dmu - prefactor * correction / integral.powi(3);
    }
    Ok(out)
}

/// Zero-frequency transfer function of `method`: the white-noise derivative
/// at shifted threshold and reset, or the Taylor-method derivative.
pub fn derivative(pops: &Populations, method: Method, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    match method {
        Method::Shift => delta_derivative(&shifted_populations(pops), config),
        Method::Taylor => taylor_derivative(pops, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{InputStatistics, NeuronParams};
    use approx::assert_relative_eq;

    fn reference_pops() -> Populations {
        let neuron = NeuronParams::uniform(0.01, 0.002, 0.002, 0.015, 0.0);
        Populations::new(&neuron, &InputStatistics::scalar(0.005, 0.005)).unwrap()
    }

    #[test]
    fn delta_derivative_reference() {
        let d = delta_derivative(&reference_pops(), &QuadratureConfig::default()).unwrap();
        assert_relative_eq!(d[0], 1_145.799_220_947_181_1, max_relative = 1e-9);
    }

    #[test]
    fn delta_derivative_matches_finite_difference() {
        let config = QuadratureConfig::default();
        let base = reference_pops();
        let h = 1e-7;
        let mut up = base.clone();
        up.mu[0] += h;
        let mut down = base.clone();
        down.mu[0] -= h;
        let fd = (delta_firing_rates(&up, &config).unwrap()[0] - delta_firing_rates(&down, &config).unwrap()[0])
            / (2.0 * h);
        assert_relative_eq!(delta_derivative(&base, &config).unwrap()[0], fd, max_relative = 1e-6);
    }

    #[test]
    fn method_specific_derivatives() {
        let config = QuadratureConfig::default();
        let shift = derivative(&reference_pops(), Method::Shift, &config).unwrap();
        assert_relative_eq!(shift[0], 760.402_793_250_740_91, max_relative = 1e-9);
        let taylor = derivative(&reference_pops(), Method::Taylor, &config).unwrap();
        assert_relative_eq!(taylor[0], 709.563_908_157_453_76, max_relative = 1e-9);
    }

    #[test]
    fn vanishing_rate_has_zero_derivative() {
        let neuron = NeuronParams::uniform(0.01, 0.002, 0.002, 0.015, 0.0);
        let pops = Populations::new(&neuron, &InputStatistics::scalar(-0.5, 0.005)).unwrap();
        assert_eq!(delta_derivative(&pops, &QuadratureConfig::default()).unwrap()[0], 0.0);
    }
}
