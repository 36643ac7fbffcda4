//! Linear response of the firing rate to a sinusoidal modulation of the
//! mean input (Schuecker et al. 2015).
//!
//! Results are indexed `[frequency, population]`.

use std::f64::consts::SQRT_2;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::colored::{shifted_populations, taylor_rates, Method, ALPHA};
use crate::derivative::{delta_derivative, taylor_derivative};
use crate::error::MeanFieldResult;
use crate::params::Populations;
use crate::parabolic::{d2_psi_difference, d_psi_difference, psi_difference};
use crate::quadrature::QuadratureConfig;
use crate::siegert::delta_firing_rates;

/// Frequencies closer to zero than this use the rate derivative.
pub const ZERO_FREQUENCY: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    pub method: Method,
    /// Respond to a perturbation of the input current instead of the input
    /// rate, which adds a low pass `1 / (1 + i omega tau_s)`.
    pub synaptic_filter: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self { method: Method::Shift, synaptic_filter: true }
    }
}

/// Transfer function in Hz/V for angular frequencies `omegas` (rad/s).
///
/// Warns once per call about populations outside the fast-synapse regime.
pub fn transfer_function(
    pops: &Populations,
    omegas: &Array1<f64>,
    options: &TransferOptions,
    config: &QuadratureConfig,
) -> MeanFieldResult<Array2<Complex64>> {
    pops.warn_slow_synapses();
    let mut result = match options.method {
        Method::Shift => shift_transfer(pops, omegas, config)?,
        Method::Taylor => taylor_transfer(pops, omegas, config)?,
    };
    if options.synaptic_filter {
        for (mut row, &omega) in result.outer_iter_mut().zip(omegas.iter()) {
            for (h, &tau_s) in row.iter_mut().zip(pops.tau_s.iter()) {
                *h /= Complex64::new(1.0, omega * tau_s);
            }
        }
    }
    Ok(result)
}

fn shift_transfer(
    pops: &Populations,
    omegas: &Array1<f64>,
    config: &QuadratureConfig,
) -> MeanFieldResult<Array2<Complex64>> {
    let shifted = shifted_populations(pops);
    let nu = delta_firing_rates(&shifted, config)?;
    let x_th = shifted.y_th() * SQRT_2;
    let x_r = shifted.y_r() * SQRT_2;
    let mut dc = None;
    let mut result = Array2::zeros((omegas.len(), pops.len()));
    for (w, &omega) in omegas.iter().enumerate() {
        if omega.abs() < ZERO_FREQUENCY {
            if dc.is_none() {
                dc = Some(delta_derivative(&shifted, config)?);
            }
            if let Some(d) = &dc {
                result.row_mut(w).assign(&d.mapv(|v| Complex64::new(v, 0.0)));
            }
            continue;
        }
        for i in 0..pops.len() {
            let tau_m = pops.tau_m[i];
            let z = Complex64::new(-0.5, omega * tau_m);
            let ratio = d_psi_difference(z, x_th[i], x_r[i]) / psi_difference(z, x_th[i], x_r[i]);
            result[[w, i]] =
                SQRT_2 / pops.sigma[i] * nu[i] / Complex64::new(1.0, omega * tau_m) * ratio;
        }
    }
    Ok(result)
}

fn taylor_transfer(
    pops: &Populations,
    omegas: &Array1<f64>,
    config: &QuadratureConfig,
) -> MeanFieldResult<Array2<Complex64>> {
    let nu0 = delta_firing_rates(pops, config)?;
    let nu = taylor_rates(pops, config)?;
    let k = pops.k();
    let x_th = pops.y_th() * SQRT_2;
    let x_r = pops.y_r() * SQRT_2;
    let mut dc = None;
    let mut result = Array2::zeros((omegas.len(), pops.len()));
    for (w, &omega) in omegas.iter().enumerate() {
        if omega.abs() < ZERO_FREQUENCY {
            if dc.is_none() {
                dc = Some(taylor_derivative(pops, config)?);
            }
            if let Some(d) = &dc {
                result.row_mut(w).assign(&d.mapv(|v| Complex64::new(v, 0.0)));
            }
            continue;
        }
        for i in 0..pops.len() {
            let tau_m = pops.tau_m[i];
            let z = Complex64::new(-0.5, omega * tau_m);
            let a = ALPHA * tau_m * nu0[i] * k[i] / SQRT_2;
            let a0 = psi_difference(z, x_th[i], x_r[i]);
            let a1 = d_psi_difference(z, x_th[i], x_r[i]) / a0;
            let a3 = a / tau_m / nu[i] * (-a1 * a1 + d2_psi_difference(z, x_th[i], x_r[i]) / a0);
            result[[w, i]] =
                SQRT_2 / pops.sigma[i] * nu[i] / Complex64::new(1.0, omega * tau_m) * (a1 + a3);
        }
    }
    Ok(result)
}
