//! lif-network: network response of coupled LIF populations, built on lif-core
//!
//! Additions over the single-population numerics:
//! - Mean and variance of the recurrent input, self-consistent working point
//! - Delay distributions, effective connectivity and propagator
//! - Eigenvalue and eigenvector spectra, sensitivity measure of the
//!   critical eigenmode
//! - Power spectra, exact and from the dominant eigenmode
//! - Connectivity reduction at a fixed working point
//! - Named parameter/result store with a pipeline front end
//!
//! Feature "parallel" evaluates per-frequency linear algebra with rayon.

pub mod inputs;
pub mod working_point;
pub mod delay;
pub mod connectivity;
pub mod eigenmodes;
pub mod sensitivity;
pub mod spectra;
pub mod store;
pub mod pipeline;

mod linalg;

// Re-exports
pub use lif_core::{MeanFieldError, MeanFieldResult};
pub use inputs::{mean_input, std_input, Connectivity};
pub use working_point::{self_consistent_rates, working_point, FixpointConfig, WorkingPoint};
pub use delay::{delay_distribution_matrix, DelayDistribution};
pub use connectivity::{effective_connectivity, propagator, reduced_indegrees};
pub use eigenmodes::{eigenmodes, EigenMatrix, Eigenmodes};
pub use linalg::resolvents;
pub use sensitivity::{critical_eigenvalue_index, sensitivity_measure, SensitivityMeasure};
pub use spectra::{approximate_power_spectra, power_spectra};
pub use store::{MemoryStore, ParameterSource, Quantity, ResultCache};
