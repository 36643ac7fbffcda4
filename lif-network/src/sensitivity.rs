//! Sensitivity measure of the critical eigenmode (Bos et al. 2016, eq. 7).
//!
//! The critical mode is the eigenvalue of the effective connectivity closest
//! to 1, where the linearized network loses stability.

use lif_core::{MeanFieldError, MeanFieldResult};
use ndarray::{Array1, Array2, Array3, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::linalg::{eigenvalues, eigenvector, map_frequencies, stack_frequencies, to_matrix};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMeasure {
    /// `T[frequency, post, pre]`
    pub measure: Array3<Complex64>,
    /// Selected eigenvalue per frequency.
    pub eigenvalues: Array1<Complex64>,
}

/// Index of the eigenvalue closest to `1 + 0i`.
pub fn critical_eigenvalue_index(eigenvalues: &[Complex64]) -> Option<usize> {
    let one = Complex64::new(1.0, 0.0);
    eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 - one).norm().total_cmp(&(b.1 - one).norm()))
        .map(|(i, _)| i)
}

/// `index` overrides the critical eigenvalue by position in the eigenvalue
/// list of each frequency.
pub fn sensitivity_measure(
    effective: &Array3<Complex64>,
    index: Option<usize>,
) -> MeanFieldResult<SensitivityMeasure> {
    let n = effective.len_of(Axis(1));
    let per_frequency = map_frequencies(effective.len_of(Axis(0)), |f| {
        let w = to_matrix(effective.index_axis(Axis(0), f));
        let eig = eigenvalues(&w)?;
        let k = match index {
            Some(k) if k < eig.len() => k,
            Some(k) => {
                return Err(MeanFieldError::invalid(
                    "eigenvalue index",
                    format!("{k} out of range for {} eigenvalues", eig.len()),
                ))
            }
            None => critical_eigenvalue_index(&eig)
                .ok_or_else(|| MeanFieldError::InvalidFormat("empty effective connectivity".into()))?,
        };
        let lambda = eig[k];
        debug!(frequency_index = f, eigenvalue = %lambda, "critical eigenvalue");
        let right = eigenvector(&w, lambda)?;
        let left = eigenvector(&w.adjoint(), lambda.conj())?;
        let norm = left.dotc(&right);
        let t = Array2::from_shape_fn((n, n), |(i, j)| left[i].conj() * right[j] / norm * w[(i, j)]);
        Ok((t, lambda))
    })?;
    let (slices, selected): (Vec<_>, Vec<_>) = per_frequency.into_iter().unzip();
    Ok(SensitivityMeasure { measure: stack_frequencies(&slices, n), eigenvalues: Array1::from(selected) })
}
