//! Firing rates for exponentially filtered synaptic currents.
//!
//! Both methods expand in `k = sqrt(tau_s / tau_m)` (Fourcaud & Brunel 2002):
//! the shift method moves threshold and reset by `sigma * alpha / 2 * k`
//! and reuses the white-noise rate, the Taylor method corrects the
//! white-noise rate to first order in `k`.

use std::f64::consts::{FRAC_1_SQRT_2, SQRT_2};

use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MeanFieldResult;
use crate::params::Populations;
use crate::quadrature::QuadratureConfig;
use crate::siegert::{delta_firing_rates, population_terms, BranchTerms, Domain};
use crate::special::{phi_neg, phi_pos};

/// `sqrt(2) * |zeta(1/2) + 1|`
pub const ALPHA: f64 = 0.651_039_589_858_122_2;

/// Above this `x_th = sqrt(2) y_th` the Taylor correction is dropped and the
/// white-noise rate is used as is.
pub(crate) const TAYLOR_X_TH_LIMIT: f64 = 20.0 * FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    Shift,
    Taylor,
}

/// Threshold and reset displacement of the shift method, per population.
pub fn threshold_shift(pops: &Populations) -> Array1<f64> {
    Zip::from(&pops.sigma).and(&pops.k()).map_collect(|s, k| s * ALPHA / 2.0 * k)
}

pub fn shifted_populations(pops: &Populations) -> Populations {
    pops.shifted(&threshold_shift(pops))
}

pub fn shift_firing_rates(pops: &Populations, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    pops.warn_slow_synapses();
    delta_firing_rates(&shifted_populations(pops), config)
}

/// `nu * (Phi(x_th) - Phi(x_r))` for one population, with every factor
/// rescaled so that no `exp(y^2)` is formed.
pub(crate) fn nu0_dphi_from_terms(terms: &BranchTerms, y_th: f64, y_r: f64) -> f64 {
    let s_th = SQRT_2 * y_th;
    let s_r = SQRT_2 * y_r;
    match terms.domain {
        Domain::Excitatory => terms.rate() * (phi_neg(s_th) - phi_neg(s_r)),
        Domain::Inhibitory => {
            (phi_pos(s_th) - (y_r * y_r - y_th * y_th).exp() * phi_pos(s_r)) / terms.denominator
        }
        Domain::Intermediate => (phi_pos(s_th) - (-y_th * y_th).exp() * phi_neg(s_r)) / terms.denominator,
    }
}

/// `nu_0 * (Phi(sqrt 2 y_th) - Phi(sqrt 2 y_r))` with `nu_0` the white-noise rate.
pub fn nu0_dphi(pops: &Populations, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    let y_th = pops.y_th();
    let y_r = pops.y_r();
    let terms = population_terms(pops, config)?;
    Ok(terms
        .iter()
        .enumerate()
        .map(|(i, t)| nu0_dphi_from_terms(t, y_th[i], y_r[i]))
        .collect())
}

pub fn taylor_firing_rates(pops: &Populations, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    pops.warn_slow_synapses();
    taylor_rates(pops, config)
}

/// [`taylor_firing_rates`] for callers that already checked the synapse regime.
pub(crate) fn taylor_rates(pops: &Populations, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    let y_th = pops.y_th();
    let y_r = pops.y_r();
    let terms = population_terms(pops, config)?;
    let rates: Array1<f64> = terms
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let nu0 = t.rate();
            if SQRT_2 * y_th[i] > TAYLOR_X_TH_LIMIT {
                return nu0;
            }
            let correction = (pops.tau_s[i] * pops.tau_m[i] / 2.0).sqrt() * ALPHA;
            nu0 * (1.0 - correction * nu0_dphi_from_terms(t, y_th[i], y_r[i]))
        })
        .collect();
    if rates.iter().any(|&r| r < 0.0) {
        warn!("negative firing rates from the Taylor method, parameters may be outside its regime; use the shift method instead");
    }
    Ok(rates)
}

pub fn firing_rates(pops: &Populations, method: Method, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    match method {
        Method::Shift => shift_firing_rates(pops, config),
        Method::Taylor => taylor_firing_rates(pops, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{InputStatistics, NeuronParams};
    use crate::special::phi;
    use approx::assert_relative_eq;

    fn pops(v_0: f64, mu: f64, sigma: f64) -> Populations {
        let neuron = NeuronParams::uniform(0.01, 0.002, 0.002, 0.015, v_0);
        Populations::new(&neuron, &InputStatistics::scalar(mu, sigma)).unwrap()
    }

    #[test]
    fn alpha_constant() {
        // zeta(1/2) = -1.4603545088095868
        assert_relative_eq!(ALPHA, SQRT_2 * (-1.460_354_508_809_586_8_f64 + 1.0).abs(), max_relative = 1e-15);
    }

    #[test]
    fn shift_method_reference() {
        let config = QuadratureConfig::default();
        let rates = shift_firing_rates(&pops(0.0, 0.005, 0.005), &config).unwrap();
        assert_relative_eq!(rates[0], 1.038_346_482_124_641_8, max_relative = 1e-10);
    }

    #[test]
    fn taylor_method_reference() {
        let config = QuadratureConfig::default();
        let low = taylor_firing_rates(&pops(0.0, 0.005, 0.005), &config).unwrap();
        assert_relative_eq!(low[0], 0.891_869_330_538_386_72, max_relative = 1e-10);
        let high = firing_rates(&pops(0.0, 0.02, 0.005), Method::Taylor, &config).unwrap();
        assert_relative_eq!(high[0], 66.011_783_152_363_715, max_relative = 1e-10);
    }

    #[test]
    fn taylor_method_can_go_negative() {
        let config = QuadratureConfig::default();
        let rates = taylor_firing_rates(&pops(0.005, 0.0, 0.004), &config).unwrap();
        assert!(rates[0] < 0.0);
        assert_relative_eq!(rates[0], -7.872_461_323_301_6e-6, max_relative = 1e-8);
    }

    #[test]
    fn rescaled_product_matches_direct_form() {
        // moderate coordinates where exp(y^2) is harmless
        let config = QuadratureConfig::default();
        for &(v_0, mu, sigma) in &[(0.0, 0.02, 0.005), (0.005, 0.0, 0.004), (0.0, 0.005, 0.005)] {
            let p = pops(v_0, mu, sigma);
            let nu0 = delta_firing_rates(&p, &config).unwrap()[0];
            let direct = nu0 * (phi(SQRT_2 * p.y_th()[0]) - phi(SQRT_2 * p.y_r()[0]));
            assert_relative_eq!(nu0_dphi(&p, &config).unwrap()[0], direct, max_relative = 1e-9);
        }
    }

    #[test]
    fn far_below_threshold_falls_back_to_white_noise_rate() {
        let config = QuadratureConfig::default();
        let p = pops(0.0, -0.05, 0.005);
        assert_eq!(
            taylor_firing_rates(&p, &config).unwrap(),
            delta_firing_rates(&p, &config).unwrap()
        );
    }

    #[test]
    fn unchecked_taylor_rates_match_the_public_ones() {
        // tau_s > tau_m: outside the fast-synapse regime, still evaluated
        let config = QuadratureConfig::default();
        let neuron = NeuronParams::uniform(0.01, 0.02, 0.002, 0.015, 0.0);
        let slow = Populations::new(&neuron, &InputStatistics::scalar(0.02, 0.005)).unwrap();
        assert!(slow.k()[0] > 1.0);
        assert_eq!(taylor_rates(&slow, &config).unwrap(), taylor_firing_rates(&slow, &config).unwrap());
    }

    #[test]
    fn method_names_serialize_in_snake_case() {
        assert_eq!(serde_json::to_string(&Method::Taylor).unwrap(), "\"taylor\"");
        assert_eq!(Method::default(), Method::Shift);
    }
}
