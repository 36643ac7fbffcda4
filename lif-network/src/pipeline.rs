//! Named-quantity front end: reads parameters and earlier results from a
//! store, computes, and caches the output.
//!
//! Parameter names: `tau_m`, `tau_s`, `tau_r`, `V_th_rel`, `V_0_rel` (neuron),
//! `J`, `K`, `J_ext`, `K_ext`, `nu_ext`, `tau_m_ext`, `N` (network), `omegas`,
//! `Delay`, `Delay_sd`, `delay_dist` (delays) and optionally `D`, a
//! precomputed delay factor of rank 1, 2 or 3.
//!
//! [`reduce_connectivity`] masks the indegrees used from then on by the
//! effective connectivity; the cached working point and transfer function
//! are kept as they are.

use lif_core::{
    InputStatistics, MeanFieldError, MeanFieldResult, Method, NeuronParams, Populations, QuadratureConfig,
    TransferOptions,
};
use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;

use crate::connectivity;
use crate::delay::{delay_distribution_matrix, DelayDistribution};
use crate::eigenmodes::{self, EigenMatrix, Eigenmodes};
use crate::inputs::{self, Connectivity};
use crate::sensitivity::{self, SensitivityMeasure};
use crate::spectra;
use crate::store::{ParameterSource, Quantity, ResultCache};
use crate::working_point::{self, FixpointConfig, WorkingPoint};

pub const FIRING_RATES: &str = "lif.exp.firing_rates";
pub const MEAN_INPUT: &str = "lif.exp.mean_input";
pub const STD_INPUT: &str = "lif.exp.std_input";
pub const TRANSFER_FUNCTION: &str = "lif.exp.transfer_function";
pub const DELAY_DISTRIBUTION: &str = "lif.exp.delay_distribution";
pub const EFFECTIVE_CONNECTIVITY: &str = "lif.exp.effective_connectivity";
pub const PROPAGATOR: &str = "lif.exp.propagator";
pub const SENSITIVITY_MEASURE: &str = "lif.exp.sensitivity_measure";
pub const CRITICAL_EIGENVALUES: &str = "lif.exp.critical_eigenvalues";
pub const POWER_SPECTRA: &str = "lif.exp.power_spectra";
pub const POWER_SPECTRA_APPROX: &str = "lif.exp.power_spectra_approx";
pub const REDUCED_INDEGREES: &str = "lif.exp.reduced_indegrees";
pub const EIGENVALUE_SPECTRA: &str = "lif.exp.eigenvalue_spectra";
pub const EIGENVECTOR_SPECTRA: &str = "lif.exp.eigenvector_spectra";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenvectorSide {
    Left,
    Right,
}

impl EigenvectorSide {
    fn as_str(self) -> &'static str {
        match self {
            EigenvectorSide::Left => "left",
            EigenvectorSide::Right => "right",
        }
    }
}

/// Result key of the eigenvalues of `matrix`, e.g.
/// `lif.exp.eigenvalue_spectra.propagator`.
pub fn eigenvalue_key(matrix: EigenMatrix) -> String {
    format!("{EIGENVALUE_SPECTRA}.{}", matrix.as_str())
}

/// Result key of the eigenvectors on `side`, e.g.
/// `lif.exp.eigenvector_spectra.left`.
pub fn eigenvector_key(side: EigenvectorSide) -> String {
    format!("{EIGENVECTOR_SPECTRA}.{}", side.as_str())
}

/// Results computed from the effective connectivity.
fn connectivity_dependent_keys() -> Vec<String> {
    let mut keys: Vec<String> = [
        EFFECTIVE_CONNECTIVITY,
        PROPAGATOR,
        SENSITIVITY_MEASURE,
        CRITICAL_EIGENVALUES,
        POWER_SPECTRA,
        POWER_SPECTRA_APPROX,
    ]
    .iter()
    .map(|k| k.to_string())
    .collect();
    keys.extend(EigenMatrix::ALL.into_iter().map(eigenvalue_key));
    keys.extend([EigenvectorSide::Left, EigenvectorSide::Right].into_iter().map(eigenvector_key));
    keys
}

fn vector<S: ParameterSource + ?Sized>(store: &S, name: &str) -> MeanFieldResult<Array1<f64>> {
    store.parameter(name)?.to_vector(name)
}

fn matrix<S: ParameterSource + ?Sized>(store: &S, name: &str) -> MeanFieldResult<Array2<f64>> {
    Ok(store.parameter(name)?.as_matrix(name)?.clone())
}

fn cached_vector<S: ResultCache + ?Sized>(store: &S, key: &str) -> MeanFieldResult<Array1<f64>> {
    store.result(key)?.to_vector(key)
}

pub fn neuron_params<S: ParameterSource + ?Sized>(store: &S) -> MeanFieldResult<NeuronParams> {
    Ok(NeuronParams {
        tau_m: vector(store, "tau_m")?,
        tau_s: vector(store, "tau_s")?,
        tau_r: vector(store, "tau_r")?,
        v_th_rel: vector(store, "V_th_rel")?,
        v_0_rel: vector(store, "V_0_rel")?,
    })
}

pub fn connectivity_params<S: ParameterSource + ?Sized>(store: &S) -> MeanFieldResult<Connectivity> {
    Ok(Connectivity {
        weights: matrix(store, "J")?,
        indegrees: matrix(store, "K")?,
        ext_weights: matrix(store, "J_ext")?,
        ext_indegrees: matrix(store, "K_ext")?,
        ext_rates: vector(store, "nu_ext")?,
        ext_tau_m: vector(store, "tau_m_ext")?,
    })
}

fn populations<S: ParameterSource + ResultCache + ?Sized>(store: &S) -> MeanFieldResult<Populations> {
    let input = InputStatistics::new(cached_vector(store, MEAN_INPUT)?, cached_vector(store, STD_INPUT)?);
    Populations::new(&neuron_params(store)?, &input)
}

pub fn firing_rates<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
    method: Method,
    fixpoint: &FixpointConfig,
    quadrature: &QuadratureConfig,
) -> MeanFieldResult<Array1<f64>> {
    let rates = working_point::self_consistent_rates(
        &neuron_params(&*store)?,
        &connectivity_params(&*store)?,
        method,
        fixpoint,
        quadrature,
    )?;
    store.store_result(FIRING_RATES, Quantity::Vector(rates.clone()));
    Ok(rates)
}

pub fn mean_input<S: ParameterSource + ResultCache + ?Sized>(store: &mut S) -> MeanFieldResult<Array1<f64>> {
    let rates = cached_vector(&*store, FIRING_RATES)?;
    let mu = inputs::mean_input(&connectivity_params(&*store)?, &vector(&*store, "tau_m")?, &rates)?;
    store.store_result(MEAN_INPUT, Quantity::Vector(mu.clone()));
    Ok(mu)
}

pub fn std_input<S: ParameterSource + ResultCache + ?Sized>(store: &mut S) -> MeanFieldResult<Array1<f64>> {
    let rates = cached_vector(&*store, FIRING_RATES)?;
    let sigma = inputs::std_input(&connectivity_params(&*store)?, &vector(&*store, "tau_m")?, &rates)?;
    store.store_result(STD_INPUT, Quantity::Vector(sigma.clone()));
    Ok(sigma)
}

/// Firing rates followed by the input statistics they imply.
pub fn working_point<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
    method: Method,
    fixpoint: &FixpointConfig,
    quadrature: &QuadratureConfig,
) -> MeanFieldResult<WorkingPoint> {
    let firing_rates = firing_rates(store, method, fixpoint, quadrature)?;
    Ok(WorkingPoint { mean_input: mean_input(store)?, std_input: std_input(store)?, firing_rates })
}

pub fn transfer_function<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
    options: &TransferOptions,
    quadrature: &QuadratureConfig,
) -> MeanFieldResult<Array2<Complex64>> {
    let pops = populations(&*store)?;
    let omegas = vector(&*store, "omegas")?;
    let h = lif_core::transfer_function(&pops, &omegas, options, quadrature)?;
    store.store_result(TRANSFER_FUNCTION, Quantity::ComplexMatrix(h.clone()));
    Ok(h)
}

pub fn delay_distribution<S: ParameterSource + ResultCache + ?Sized>(store: &mut S) -> MeanFieldResult<Array3<Complex64>> {
    let distribution: DelayDistribution = store.parameter("delay_dist")?.as_text("delay_dist")?.parse()?;
    let d = delay_distribution_matrix(
        &matrix(&*store, "Delay")?,
        &matrix(&*store, "Delay_sd")?,
        distribution,
        &vector(&*store, "omegas")?,
    )?;
    store.store_result(DELAY_DISTRIBUTION, Quantity::ComplexTensor(d.clone()));
    Ok(d)
}

pub fn effective_connectivity<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
) -> MeanFieldResult<Array3<Complex64>> {
    let h = store.result(TRANSFER_FUNCTION)?.as_complex_matrix(TRANSFER_FUNCTION)?.clone();
    let delay = match store.get_result(DELAY_DISTRIBUTION) {
        Some(d) => d.to_complex_array(DELAY_DISTRIBUTION)?,
        None => match store.get_parameter("D") {
            Some(d) => d.to_complex_array("D")?,
            None => return Err(MeanFieldError::MissingResult(DELAY_DISTRIBUTION.to_string())),
        },
    };
    let indegrees = match store.get_result(REDUCED_INDEGREES) {
        Some(k) => k.as_matrix(REDUCED_INDEGREES)?.clone(),
        None => matrix(&*store, "K")?,
    };
    let w = connectivity::effective_connectivity(
        &h,
        &delay,
        &matrix(&*store, "J")?,
        &indegrees,
        &vector(&*store, "tau_m")?,
    )?;
    store.store_result(EFFECTIVE_CONNECTIVITY, Quantity::ComplexTensor(w.clone()));
    Ok(w)
}

fn cached_effective_connectivity<S: ResultCache + ?Sized>(store: &S) -> MeanFieldResult<Array3<Complex64>> {
    Ok(store.result(EFFECTIVE_CONNECTIVITY)?.as_complex_tensor(EFFECTIVE_CONNECTIVITY)?.clone())
}

pub fn propagator<S: ParameterSource + ResultCache + ?Sized>(store: &mut S) -> MeanFieldResult<Array3<Complex64>> {
    let p = connectivity::propagator(&cached_effective_connectivity(&*store)?)?;
    store.store_result(PROPAGATOR, Quantity::ComplexTensor(p.clone()));
    Ok(p)
}

pub fn sensitivity_measure<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
    index: Option<usize>,
) -> MeanFieldResult<SensitivityMeasure> {
    let s = sensitivity::sensitivity_measure(&cached_effective_connectivity(&*store)?, index)?;
    store.store_result(SENSITIVITY_MEASURE, Quantity::ComplexTensor(s.measure.clone()));
    store.store_result(CRITICAL_EIGENVALUES, Quantity::ComplexArray(s.eigenvalues.clone().into_dyn()));
    Ok(s)
}

pub fn power_spectra<S: ParameterSource + ResultCache + ?Sized>(store: &mut S) -> MeanFieldResult<Array2<f64>> {
    let power = spectra::power_spectra(
        &cached_effective_connectivity(&*store)?,
        &cached_vector(&*store, FIRING_RATES)?,
        &vector(&*store, "N")?,
    )?;
    store.store_result(POWER_SPECTRA, Quantity::Matrix(power.clone()));
    Ok(power)
}

pub fn power_spectra_approx<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
) -> MeanFieldResult<Array2<f64>> {
    let power = spectra::approximate_power_spectra(
        &cached_effective_connectivity(&*store)?,
        &cached_vector(&*store, FIRING_RATES)?,
        &vector(&*store, "N")?,
    )?;
    store.store_result(POWER_SPECTRA_APPROX, Quantity::Matrix(power.clone()));
    Ok(power)
}

/// Eigenvalues `[frequency, mode]` of `matrix`.
pub fn eigenvalue_spectra<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
    matrix: EigenMatrix,
) -> MeanFieldResult<Array2<Complex64>> {
    let modes = eigenmodes::eigenmodes(&cached_effective_connectivity(&*store)?, matrix)?;
    store.store_result(&eigenvalue_key(matrix), Quantity::ComplexMatrix(modes.eigenvalues.clone()));
    Ok(modes.eigenvalues)
}

/// Eigenvectors shared by the effective connectivity and both propagators:
/// right ones as `[frequency, component, mode]`, left ones as
/// `[frequency, mode, component]`.
pub fn eigenvector_spectra<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
    side: EigenvectorSide,
) -> MeanFieldResult<Array3<Complex64>> {
    let Eigenmodes { left, right, .. } =
        eigenmodes::eigenmodes(&cached_effective_connectivity(&*store)?, EigenMatrix::EffectiveConnectivity)?;
    let vectors = match side {
        EigenvectorSide::Left => left,
        EigenvectorSide::Right => right,
    };
    store.store_result(&eigenvector_key(side), Quantity::ComplexTensor(vectors.clone()));
    Ok(vectors)
}

/// Scales the indegrees `K` by `mask` for all later effective connectivity
/// computations and drops the results derived from the old one.
pub fn reduce_connectivity<S: ParameterSource + ResultCache + ?Sized>(
    store: &mut S,
    mask: &Array2<f64>,
) -> MeanFieldResult<Array2<f64>> {
    let reduced = connectivity::reduced_indegrees(&matrix(&*store, "K")?, mask)?;
    for key in connectivity_dependent_keys() {
        store.remove_result(&key);
    }
    store.store_result(REDUCED_INDEGREES, Quantity::Matrix(reduced.clone()));
    Ok(reduced)
}

/// Undoes [`reduce_connectivity`].
pub fn restore_full_connectivity<S: ResultCache + ?Sized>(store: &mut S) {
    store.remove_result(REDUCED_INDEGREES);
    for key in connectivity_dependent_keys() {
        store.remove_result(&key);
    }
}
