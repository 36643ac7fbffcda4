//! Population rate power spectra (Bos et al. 2016, eq. 18) and their
//! dominant-eigenmode approximation (Bos et al. 2015, eq. 15).

use lif_core::{MeanFieldError, MeanFieldResult};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Array3, Axis};
use num_complex::Complex64;

use crate::linalg::{eigenvalues, eigenvector, map_frequencies, resolvent, to_matrix};
use crate::sensitivity::critical_eigenvalue_index;

/// `A = diag(nu / N)`
fn noise_intensity(n: usize, rates: &Array1<f64>, sizes: &Array1<f64>) -> MeanFieldResult<DMatrix<Complex64>> {
    if rates.len() != n {
        return Err(MeanFieldError::shape("firing rates", n, rates.len()));
    }
    if sizes.len() != n {
        return Err(MeanFieldError::shape("N", n, sizes.len()));
    }
    if sizes.iter().any(|&s| s <= 0.0) {
        return Err(MeanFieldError::invalid("N", "population sizes must be positive"));
    }
    Ok(DMatrix::from_diagonal(&DVector::from_fn(n, |i, _| Complex64::new(rates[i] / sizes[i], 0.0))))
}

/// Real diagonal of `Q A Q^H` for the `Q` that `resolve` returns per frequency.
fn diagonal_power<F>(n_omega: usize, a: &DMatrix<Complex64>, resolve: F) -> MeanFieldResult<Array2<f64>>
where
    F: Fn(usize) -> MeanFieldResult<DMatrix<Complex64>> + Sync + Send,
{
    let n = a.nrows();
    let rows = map_frequencies(n_omega, |f| {
        let q = resolve(f)?;
        let c = &q * a * q.adjoint();
        Ok((0..n).map(|i| c[(i, i)].re).collect::<Vec<_>>())
    })?;
    let mut power = Array2::zeros((n_omega, n));
    for (mut row, values) in power.axis_iter_mut(Axis(0)).zip(rows) {
        row.assign(&Array1::from(values));
    }
    Ok(power)
}

/// Power spectra in Hz^2, indexed `[frequency, population]`.
///
/// Per frequency `C = Q A Q^H` with `Q = (I - W)^-1` and
/// `A = diag(nu / N)`. The diagonal of `C` is real up to rounding and only
/// its real part is returned.
pub fn power_spectra(
    effective: &Array3<Complex64>,
    rates: &Array1<f64>,
    sizes: &Array1<f64>,
) -> MeanFieldResult<Array2<f64>> {
    let (n_omega, n, _) = effective.dim();
    let a = noise_intensity(n, rates, sizes)?;
    diagonal_power(n_omega, &a, |f| resolvent(&to_matrix(effective.index_axis(Axis(0), f)), f))
}

/// Power spectra keeping only the eigenmode of `W` closest to 1 at each
/// frequency: `W` is replaced by `lambda r l^H / (l^H r)` before forming
/// `C = Q A Q^H`. Exact for a single population.
pub fn approximate_power_spectra(
    effective: &Array3<Complex64>,
    rates: &Array1<f64>,
    sizes: &Array1<f64>,
) -> MeanFieldResult<Array2<f64>> {
    let (n_omega, n, _) = effective.dim();
    let a = noise_intensity(n, rates, sizes)?;
    diagonal_power(n_omega, &a, |f| {
        let w = to_matrix(effective.index_axis(Axis(0), f));
        let eig = eigenvalues(&w)?;
        let lambda = critical_eigenvalue_index(&eig)
            .map(|k| eig[k])
            .ok_or_else(|| MeanFieldError::InvalidFormat("empty effective connectivity".into()))?;
        let right = eigenvector(&w, lambda)?;
        let left = eigenvector(&w.adjoint(), lambda.conj())?;
        let overlap = left.dotc(&right);
        if overlap.norm() == 0.0 {
            return Err(MeanFieldError::SingularMatrix { frequency_index: f });
        }
        let factor = lambda / overlap;
        let mode = (&right * left.adjoint()).map(|x| x * factor);
        resolvent(&mode, f)
    })
}
