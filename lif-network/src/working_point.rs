//! Self-consistent firing rates of a recurrent network.
//!
//! Rates enter the input statistics, which set the rates. The fixed point is
//! found by relaxing `nu <- nu + dt (f(mu(nu), sigma(nu)) - nu)` from zero.

use lif_core::{
    firing_rates, InputStatistics, MeanFieldError, MeanFieldResult, Method, NeuronParams, Populations,
    QuadratureConfig,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inputs::{mean_input, std_input, Connectivity};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixpointConfig {
    /// Relaxation step.
    pub dt: f64,
    /// Stop once the largest rate change of one step falls below this, in Hz.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for FixpointConfig {
    fn default() -> Self {
        Self { dt: 0.05, tolerance: 1e-5, max_iterations: 100_000 }
    }
}

/// Stationary state of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingPoint {
    pub firing_rates: Array1<f64>,
    pub mean_input: Array1<f64>,
    pub std_input: Array1<f64>,
}

pub fn self_consistent_rates(
    neuron: &NeuronParams,
    conn: &Connectivity,
    method: Method,
    fixpoint: &FixpointConfig,
    quadrature: &QuadratureConfig,
) -> MeanFieldResult<Array1<f64>> {
    if !(fixpoint.dt > 0.0 && fixpoint.dt <= 1.0) {
        return Err(MeanFieldError::invalid("dt", "must lie in (0, 1]"));
    }
    let n = conn.populations()?;
    let mut nu = Array1::zeros(n);
    let mut max_change = f64::INFINITY;
    for iteration in 0..fixpoint.max_iterations {
        let input = InputStatistics::new(
            mean_input(conn, &neuron.tau_m, &nu)?,
            std_input(conn, &neuron.tau_m, &nu)?,
        );
        let pops = Populations::new(neuron, &input)?;
        let target = firing_rates(&pops, method, quadrature)?;
        let step = (target - &nu) * fixpoint.dt;
        max_change = step.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
        nu += &step;
        if max_change < fixpoint.tolerance {
            debug!(iterations = iteration + 1, "firing rates converged");
            return Ok(nu);
        }
    }
    Err(MeanFieldError::FixpointConvergence { iterations: fixpoint.max_iterations, max_change })
}

pub fn working_point(
    neuron: &NeuronParams,
    conn: &Connectivity,
    method: Method,
    fixpoint: &FixpointConfig,
    quadrature: &QuadratureConfig,
) -> MeanFieldResult<WorkingPoint> {
    let firing_rates = self_consistent_rates(neuron, conn, method, fixpoint, quadrature)?;
    Ok(WorkingPoint {
        mean_input: mean_input(conn, &neuron.tau_m, &firing_rates)?,
        std_input: std_input(conn, &neuron.tau_m, &firing_rates)?,
        firing_rates,
    })
}
