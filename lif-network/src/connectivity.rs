//! Effective connectivity and propagator (Bos et al. 2016).

use lif_core::{equalize_shape, MeanFieldError, MeanFieldResult};
use ndarray::{Array1, Array2, Array3, ArrayD, Axis, Ix1, Ix2, Ix3};
use num_complex::Complex64;

use crate::linalg::{map_frequencies, resolvent, stack_frequencies, to_array, to_matrix};

/// `W[f, i, j] = tau_m_i J_ij K_ij H[f, i] D`, with the delay factor `D`
/// broadcast by rank:
///
/// - rank 1, `D[j]`: one factor per presynaptic population, all frequencies
/// - rank 2, `D[i, j]`: one factor per connection, all frequencies
/// - rank 3, `D[f, i, j]`: per frequency and connection
pub fn effective_connectivity(
    transfer: &Array2<Complex64>,
    delay: &ArrayD<Complex64>,
    weights: &Array2<f64>,
    indegrees: &Array2<f64>,
    tau_m: &Array1<f64>,
) -> MeanFieldResult<Array3<Complex64>> {
    let (n_omega, n) = transfer.dim();
    if weights.dim() != (n, n) {
        return Err(MeanFieldError::shape("J", n * n, weights.len()));
    }
    if indegrees.dim() != (n, n) {
        return Err(MeanFieldError::shape("K", n * n, indegrees.len()));
    }
    let tau_m = equalize_shape("tau_m", tau_m, n)?;
    let coupling = weights * indegrees;

    let d = match delay.ndim() {
        1 => {
            let d = delay.view().into_dimensionality::<Ix1>().map_err(shape_error)?;
            if d.len() != n {
                return Err(MeanFieldError::shape("delay distribution", n, d.len()));
            }
            Array3::from_shape_fn((n_omega, n, n), |(_, _, j)| d[j])
        }
        2 => {
            let d = delay.view().into_dimensionality::<Ix2>().map_err(shape_error)?;
            if d.dim() != (n, n) {
                return Err(MeanFieldError::shape("delay distribution", n * n, d.len()));
            }
            Array3::from_shape_fn((n_omega, n, n), |(_, i, j)| d[[i, j]])
        }
        3 => {
            let d = delay.view().into_dimensionality::<Ix3>().map_err(shape_error)?;
            if d.dim() != (n_omega, n, n) {
                return Err(MeanFieldError::shape("delay distribution", n_omega * n * n, d.len()));
            }
            d.to_owned()
        }
        rank => {
            return Err(MeanFieldError::InvalidFormat(format!(
                "delay distribution of rank {rank}, expected 1, 2 or 3"
            )))
        }
    };

    Ok(Array3::from_shape_fn((n_omega, n, n), |(f, i, j)| {
        transfer[[f, i]] * (tau_m[i] * coupling[[i, j]]) * d[[f, i, j]]
    }))
}

fn shape_error(err: ndarray::ShapeError) -> MeanFieldError {
    MeanFieldError::InvalidFormat(err.to_string())
}

/// Indegrees scaled connection by connection, `K_ij mask_ij`. A mask of
/// zeros and ones cuts connections out of the effective connectivity.
pub fn reduced_indegrees(indegrees: &Array2<f64>, mask: &Array2<f64>) -> MeanFieldResult<Array2<f64>> {
    if mask.dim() != indegrees.dim() {
        return Err(MeanFieldError::shape("connection mask", indegrees.len(), mask.len()));
    }
    Ok(indegrees * mask)
}

/// `(I - W)^-1 W` per frequency.
pub fn propagator(effective: &Array3<Complex64>) -> MeanFieldResult<Array3<Complex64>> {
    let n = effective.len_of(Axis(1));
    let slices = map_frequencies(effective.len_of(Axis(0)), |f| {
        let w = to_matrix(effective.index_axis(Axis(0), f));
        let q = resolvent(&w, f)?;
        Ok(to_array(&(q * w)))
    })?;
    Ok(stack_frequencies(&slices, n))
}
