//! Stationary firing rate of a leaky integrate-and-fire neuron driven by
//! white noise (Siegert formula).
//!
//! The rate is evaluated in one of three closed forms depending on where
//! threshold and reset sit relative to the mean input. Every form is written
//! as `numerator / denominator` so that callers needing the rescaled rate
//! `nu * exp(y_th^2)` (the exponential-synapse corrections) can share the
//! same branch evaluation.

use std::f64::consts::PI;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::MeanFieldResult;
use crate::params::Populations;
use crate::quadrature::{find_order_for, GaussLegendre, QuadratureConfig};
use crate::special::dawson;

/// Position of threshold and reset relative to the mean input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Mean input above threshold, `y_th < 0`.
    Excitatory,
    /// Mean input below reset, `y_r > 0`.
    Inhibitory,
    /// `y_r <= 0 <= y_th`.
    Intermediate,
}

impl Domain {
    pub fn classify(y_th: f64, y_r: f64) -> Self {
        if y_th < 0.0 {
            Domain::Excitatory
        } else if y_r > 0.0 {
            Domain::Inhibitory
        } else {
            Domain::Intermediate
        }
    }
}

/// Rate of one population as `numerator / denominator`.
///
/// For the inhibitory and intermediate domains `numerator = exp(-y_th^2)`,
/// so `1 / denominator` is the rate rescaled by `exp(y_th^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BranchTerms {
    pub domain: Domain,
    pub numerator: f64,
    pub denominator: f64,
}

impl BranchTerms {
    pub fn rate(&self) -> f64 {
        self.numerator / self.denominator
    }
}

pub(crate) fn branch_terms(y_th: f64, y_r: f64, tau_m: f64, tau_r: f64, rule: &GaussLegendre) -> BranchTerms {
    let sqrt_pi = PI.sqrt();
    let domain = Domain::classify(y_th, y_r);
    match domain {
        Domain::Excitatory => {
            let integral = rule.erfcx_integral(y_th.abs(), y_r.abs());
            BranchTerms { domain, numerator: 1.0, denominator: tau_r + tau_m * sqrt_pi * integral }
        }
        Domain::Inhibitory => {
            let e = (-y_th * y_th).exp();
            let int = 2.0 * dawson(y_th)
                - 2.0 * (y_r * y_r - y_th * y_th).exp() * dawson(y_r)
                - e * rule.erfcx_integral(y_r, y_th);
            BranchTerms { domain, numerator: e, denominator: e * tau_r + tau_m * sqrt_pi * int }
        }
        Domain::Intermediate => {
            let e = (-y_th * y_th).exp();
            let int = 2.0 * dawson(y_th) + e * rule.erfcx_integral(y_th, y_r.abs());
            BranchTerms { domain, numerator: e, denominator: e * tau_r + tau_m * sqrt_pi * int }
        }
    }
}

/// Branch terms for every population, sharing one quadrature order.
pub(crate) fn population_terms(pops: &Populations, config: &QuadratureConfig) -> MeanFieldResult<Vec<BranchTerms>> {
    let y_th = pops.y_th();
    let y_r = pops.y_r();
    let order = find_order_for(y_th.iter().chain(y_r.iter()), config)?;
    let rule = GaussLegendre::new(order);
    Ok((0..pops.len())
        .map(|i| branch_terms(y_th[i], y_r[i], pops.tau_m[i], pops.tau_r[i], &rule))
        .collect())
}

/// Firing rates for delta-shaped synaptic currents, in Hz.
pub fn delta_firing_rates(pops: &Populations, config: &QuadratureConfig) -> MeanFieldResult<Array1<f64>> {
    let terms = population_terms(pops, config)?;
    Ok(terms.iter().map(BranchTerms::rate).collect())
}
