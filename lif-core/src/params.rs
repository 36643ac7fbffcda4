//! Per-population parameter records.
//!
//! Every field is a vector over populations. A vector of length one stands
//! for "the same value in every population" and is broadcast when the
//! records are combined into [`Populations`].

use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MeanFieldError, MeanFieldResult};

/// Membrane and synapse properties, in seconds and volts relative to rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronParams {
    pub tau_m: Array1<f64>,
    pub tau_s: Array1<f64>,
    pub tau_r: Array1<f64>,
    pub v_th_rel: Array1<f64>,
    pub v_0_rel: Array1<f64>,
}

impl NeuronParams {
    /// Same parameters for all populations.
    pub fn uniform(tau_m: f64, tau_s: f64, tau_r: f64, v_th_rel: f64, v_0_rel: f64) -> Self {
        Self {
            tau_m: Array1::from_elem(1, tau_m),
            tau_s: Array1::from_elem(1, tau_s),
            tau_r: Array1::from_elem(1, tau_r),
            v_th_rel: Array1::from_elem(1, v_th_rel),
            v_0_rel: Array1::from_elem(1, v_0_rel),
        }
    }
}

/// Gaussian input statistics: mean and standard deviation in volts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputStatistics {
    pub mu: Array1<f64>,
    pub sigma: Array1<f64>,
}

impl InputStatistics {
    pub fn new(mu: Array1<f64>, sigma: Array1<f64>) -> Self {
        Self { mu, sigma }
    }

    pub fn scalar(mu: f64, sigma: f64) -> Self {
        Self { mu: Array1::from_elem(1, mu), sigma: Array1::from_elem(1, sigma) }
    }
}

/// Broadcast `values` to length `n`. Only length one broadcasts.
pub fn equalize_shape(name: &str, values: &Array1<f64>, n: usize) -> MeanFieldResult<Array1<f64>> {
    match values.len() {
        len if len == n => Ok(values.clone()),
        1 => Ok(Array1::from_elem(n, values[0])),
        len => Err(MeanFieldError::shape(name, n, len)),
    }
}

/// Validated parameters of `n` populations, all fields of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Populations {
    pub tau_m: Array1<f64>,
    pub tau_s: Array1<f64>,
    pub tau_r: Array1<f64>,
    pub v_th: Array1<f64>,
    pub v_0: Array1<f64>,
    pub mu: Array1<f64>,
    pub sigma: Array1<f64>,
}

impl Populations {
    pub fn new(neuron: &NeuronParams, input: &InputStatistics) -> MeanFieldResult<Self> {
        let fields: [(&str, &Array1<f64>); 7] = [
            ("tau_m", &neuron.tau_m),
            ("tau_s", &neuron.tau_s),
            ("tau_r", &neuron.tau_r),
            ("V_th_rel", &neuron.v_th_rel),
            ("V_0_rel", &neuron.v_0_rel),
            ("mean_input", &input.mu),
            ("std_input", &input.sigma),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.is_empty()) {
            return Err(MeanFieldError::shape(*name, 1, 0));
        }
        let n = fields.iter().map(|(_, v)| v.len()).max().unwrap_or(1);
        let pops = Self {
            tau_m: equalize_shape(fields[0].0, fields[0].1, n)?,
            tau_s: equalize_shape(fields[1].0, fields[1].1, n)?,
            tau_r: equalize_shape(fields[2].0, fields[2].1, n)?,
            v_th: equalize_shape(fields[3].0, fields[3].1, n)?,
            v_0: equalize_shape(fields[4].0, fields[4].1, n)?,
            mu: equalize_shape(fields[5].0, fields[5].1, n)?,
            sigma: equalize_shape(fields[6].0, fields[6].1, n)?,
        };
        pops.validate()?;
        Ok(pops)
    }

    fn validate(&self) -> MeanFieldResult<()> {
        for (name, values) in [
            ("tau_m", &self.tau_m),
            ("tau_s", &self.tau_s),
            ("tau_r", &self.tau_r),
            ("V_th_rel", &self.v_th),
            ("V_0_rel", &self.v_0),
            ("mean_input", &self.mu),
            ("std_input", &self.sigma),
        ] {
            if values.iter().any(|v| !v.is_finite()) {
                return Err(MeanFieldError::invalid(name, "must be finite"));
            }
        }
        if self.tau_m.iter().any(|&t| t <= 0.0) {
            return Err(MeanFieldError::invalid("tau_m", "must be positive"));
        }
        if self.tau_s.iter().any(|&t| t < 0.0) {
            return Err(MeanFieldError::invalid("tau_s", "must be non-negative"));
        }
        if self.tau_r.iter().any(|&t| t < 0.0) {
            return Err(MeanFieldError::invalid("tau_r", "must be non-negative"));
        }
        if self.sigma.iter().any(|&s| s == 0.0) {
            return Err(MeanFieldError::DivisionByZero { name: "sigma" });
        }
        if self.sigma.iter().any(|&s| s < 0.0) {
            return Err(MeanFieldError::invalid("sigma", "must be positive"));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mu.is_empty()
    }

    /// `(V_th - mu) / sigma`
    pub fn y_th(&self) -> Array1<f64> {
        (&self.v_th - &self.mu) / &self.sigma
    }

    /// `(V_0 - mu) / sigma`
    pub fn y_r(&self) -> Array1<f64> {
        (&self.v_0 - &self.mu) / &self.sigma
    }

    /// `sqrt(tau_s / tau_m)`, the expansion parameter of the colored-noise corrections.
    pub fn k(&self) -> Array1<f64> {
        Zip::from(&self.tau_s).and(&self.tau_m).map_collect(|ts, tm| (ts / tm).sqrt())
    }

    /// Same populations with threshold and reset moved up by `shift`.
    pub fn shifted(&self, shift: &Array1<f64>) -> Self {
        Self { v_th: &self.v_th + shift, v_0: &self.v_0 + shift, ..self.clone() }
    }

    /// Logs a warning for every population outside the fast-synapse regime.
    pub fn warn_slow_synapses(&self) {
        for (i, k) in self.k().iter().enumerate() {
            if *k > 1.0 {
                warn!(population = i, k, "sqrt(tau_s / tau_m) > 1, colored-noise approximation is outside its range");
            }
        }
    }
}
