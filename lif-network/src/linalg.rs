//! Dense complex linear algebra on per-frequency slices.

use lif_core::{MeanFieldError, MeanFieldResult};
use nalgebra::{linalg::Schur, DMatrix, DVector};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use num_complex::Complex64;

const SCHUR_MAX_ITER: usize = 10_000;
const INVERSE_ITERATION_STEPS: usize = 3;

pub(crate) fn to_matrix(w: ArrayView2<'_, Complex64>) -> DMatrix<Complex64> {
    DMatrix::from_fn(w.nrows(), w.ncols(), |i, j| w[[i, j]])
}

pub(crate) fn to_array(m: &DMatrix<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// `(I - W)^-1`
pub(crate) fn resolvent(w: &DMatrix<Complex64>, frequency_index: usize) -> MeanFieldResult<DMatrix<Complex64>> {
    let n = w.nrows();
    (DMatrix::identity(n, n) - w)
        .try_inverse()
        .ok_or(MeanFieldError::SingularMatrix { frequency_index })
}

pub(crate) fn eigenvalues(w: &DMatrix<Complex64>) -> MeanFieldResult<Vec<Complex64>> {
    let schur = Schur::try_new(w.clone(), f64::EPSILON, SCHUR_MAX_ITER)
        .ok_or_else(|| MeanFieldError::InvalidFormat("Schur decomposition did not converge".into()))?;
    let (_, t) = schur.unpack();
    Ok(t.diagonal().iter().copied().collect())
}

pub(crate) fn default_start(n: usize) -> DVector<Complex64> {
    DVector::from_fn(n, |i, _| Complex64::new(1.0, 0.1 * i as f64))
}

/// Unit eigenvector of `w` for eigenvalue `lambda` by shifted inverse iteration.
pub(crate) fn eigenvector(w: &DMatrix<Complex64>, lambda: Complex64) -> MeanFieldResult<DVector<Complex64>> {
    eigenvector_from(w, lambda, &default_start(w.nrows()))
}

/// Same as [`eigenvector`], iterating from `start`. Distinct starts give
/// independent vectors inside a repeated eigenvalue's eigenspace.
pub(crate) fn eigenvector_from(
    w: &DMatrix<Complex64>,
    lambda: Complex64,
    start: &DVector<Complex64>,
) -> MeanFieldResult<DVector<Complex64>> {
    let n = w.nrows();
    let scale = 1.0 + lambda.norm() + w.norm();
    let mut shift = 1e-10 * scale;
    for _ in 0..8 {
        let shifted = w - DMatrix::identity(n, n) * (lambda + shift);
        let lu = shifted.lu();
        let mut v = start.clone();
        let mut ok = true;
        for _ in 0..INVERSE_ITERATION_STEPS {
            match lu.solve(&v) {
                Some(next) if next.iter().all(|c| c.re.is_finite() && c.im.is_finite()) => {
                    let norm = next.norm();
                    if norm == 0.0 {
                        ok = false;
                        break;
                    }
                    v = next.unscale(norm);
                }
                _ => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            return Ok(v);
        }
        shift *= 100.0;
    }
    Err(MeanFieldError::InvalidFormat(format!("no eigenvector found for eigenvalue {lambda}")))
}

/// Applies `f` to every frequency index, in parallel with the `parallel` feature.
pub(crate) fn map_frequencies<T, F>(n: usize, f: F) -> MeanFieldResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> MeanFieldResult<T> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..n).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..n).map(f).collect()
    }
}

/// Stacks per-frequency `n x n` matrices along a new leading axis.
pub(crate) fn stack_frequencies(slices: &[Array2<Complex64>], n: usize) -> Array3<Complex64> {
    let mut out = Array3::zeros((slices.len(), n, n));
    for (mut target, slice) in out.axis_iter_mut(Axis(0)).zip(slices) {
        target.assign(slice);
    }
    out
}

/// `(I - W)^-1` for every frequency slice of `w[frequency, post, pre]`.
pub fn resolvents(w: &Array3<Complex64>) -> MeanFieldResult<Array3<Complex64>> {
    let slices = map_frequencies(w.len_of(Axis(0)), |f| {
        resolvent(&to_matrix(w.index_axis(Axis(0), f)), f).map(|q| to_array(&q))
    })?;
    Ok(stack_frequencies(&slices, w.len_of(Axis(1))))
}
