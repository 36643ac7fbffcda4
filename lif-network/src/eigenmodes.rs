//! Eigenmode decomposition per frequency of the effective connectivity `W`
//! and the matrices derived from it (Bos et al. 2016, sec. 2.4).
//!
//! `W`, the propagator `(I - W)^-1` and its inverse `I - W` share their
//! eigenvectors; only the eigenvalues differ. Modes are ordered as the
//! diagonal of the Schur form at each frequency and are not tracked across
//! frequencies.

use lif_core::{MeanFieldError, MeanFieldResult};
use nalgebra::DMatrix;
use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::linalg::{default_start, eigenvalues, eigenvector_from, map_frequencies, to_matrix};

/// Frobenius condition estimate of `V` above which `W` counts as defective.
const MAX_CONDITION: f64 = 1e10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EigenMatrix {
    /// `W`
    #[default]
    EffectiveConnectivity,
    /// `(I - W)^-1`
    Propagator,
    /// `I - W`
    InversePropagator,
}

impl EigenMatrix {
    pub const ALL: [EigenMatrix; 3] =
        [EigenMatrix::EffectiveConnectivity, EigenMatrix::Propagator, EigenMatrix::InversePropagator];

    pub fn as_str(self) -> &'static str {
        match self {
            EigenMatrix::EffectiveConnectivity => "effective_connectivity",
            EigenMatrix::Propagator => "propagator",
            EigenMatrix::InversePropagator => "inverse_propagator",
        }
    }

    /// Eigenvalue of this matrix for eigenvalue `lambda` of `W`.
    fn map(self, lambda: Complex64, frequency_index: usize) -> MeanFieldResult<Complex64> {
        let one = Complex64::new(1.0, 0.0);
        match self {
            EigenMatrix::EffectiveConnectivity => Ok(lambda),
            EigenMatrix::InversePropagator => Ok(one - lambda),
            EigenMatrix::Propagator if lambda == one => Err(MeanFieldError::SingularMatrix { frequency_index }),
            EigenMatrix::Propagator => Ok((one - lambda).inv()),
        }
    }
}

impl std::str::FromStr for EigenMatrix {
    type Err = MeanFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "effective_connectivity" => Ok(Self::EffectiveConnectivity),
            "propagator" => Ok(Self::Propagator),
            "inverse_propagator" => Ok(Self::InversePropagator),
            other => Err(MeanFieldError::InvalidFormat(format!("unknown eigenmode matrix {other:?}"))),
        }
    }
}

/// Eigenvalues and biorthonormal eigenvectors for every frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eigenmodes {
    /// `[frequency, mode]`
    pub eigenvalues: Array2<Complex64>,
    /// `[frequency, component, mode]`, unit columns.
    pub right: Array3<Complex64>,
    /// `[frequency, mode, component]`, rows scaled so that `left_k . right_j = delta_kj`.
    pub left: Array3<Complex64>,
}

/// Per frequency `W = V diag(lambda) V^-1`; the right eigenvectors are the
/// columns of `V` and the left ones the rows of `V^-1`. A defective `W` is
/// reported as a singular matrix at its frequency.
pub fn eigenmodes(effective: &Array3<Complex64>, matrix: EigenMatrix) -> MeanFieldResult<Eigenmodes> {
    let (n_omega, n, _) = effective.dim();
    let per_frequency = map_frequencies(n_omega, |f| {
        let w = to_matrix(effective.index_axis(Axis(0), f));
        let eig = eigenvalues(&w)?;
        let mut v = DMatrix::<Complex64>::zeros(n, n);
        for (k, &lambda) in eig.iter().enumerate() {
            let mut start = default_start(n);
            start[k] += Complex64::new(1.0, 0.0);
            v.set_column(k, &eigenvector_from(&w, lambda, &start)?);
        }
        let v_inv = v
            .clone()
            .try_inverse()
            .filter(|inv| inv.norm() * v.norm() < MAX_CONDITION)
            .ok_or(MeanFieldError::SingularMatrix { frequency_index: f })?;
        let values = eig.iter().map(|&lambda| matrix.map(lambda, f)).collect::<MeanFieldResult<Vec<_>>>()?;
        debug!(frequency_index = f, modes = n, "eigenmodes");
        Ok((values, v, v_inv))
    })?;

    let mut out = Eigenmodes {
        eigenvalues: Array2::zeros((n_omega, n)),
        right: Array3::zeros((n_omega, n, n)),
        left: Array3::zeros((n_omega, n, n)),
    };
    for (f, (values, v, v_inv)) in per_frequency.into_iter().enumerate() {
        for k in 0..n {
            out.eigenvalues[[f, k]] = values[k];
            for i in 0..n {
                out.right[[f, i, k]] = v[(i, k)];
                out.left[[f, k, i]] = v_inv[(k, i)];
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    const SPECTRUM: [Complex64; 3] = [
        Complex64 { re: 0.2, im: 0.0 },
        Complex64 { re: 0.95, im: 0.1 },
        Complex64 { re: 0.0, im: 0.5 },
    ];

    /// Two frequencies of `P diag(SPECTRUM) P^-1` and its transpose.
    fn known_spectrum() -> Array3<Complex64> {
        let p = DMatrix::from_row_slice(3, 3, &[
            c(1.0, 0.0), c(0.3, 0.1), c(-0.2, 0.0),
            c(0.1, -0.2), c(1.0, 0.0), c(0.4, 0.0),
            c(0.0, 0.3), c(-0.1, 0.0), c(1.0, 0.0),
        ]);
        let d = DMatrix::from_diagonal(&DVector::from_row_slice(&SPECTRUM));
        let w = &p * d * p.clone().try_inverse().unwrap();
        let wt = w.transpose();
        Array3::from_shape_fn((2, 3, 3), |(f, i, j)| if f == 0 { w[(i, j)] } else { wt[(i, j)] })
    }

    fn contains(values: &[Complex64], target: Complex64) -> bool {
        values.iter().any(|v| (v - target).norm() < 1e-10)
    }

    #[test]
    fn decomposes_each_frequency() {
        let w = known_spectrum();
        let modes = eigenmodes(&w, EigenMatrix::EffectiveConnectivity).unwrap();
        for f in 0..2 {
            let wf = to_matrix(w.index_axis(Axis(0), f));
            let values: Vec<_> = modes.eigenvalues.index_axis(Axis(0), f).to_vec();
            for &lambda in &SPECTRUM {
                assert!(contains(&values, lambda), "{lambda} missing at {f}");
            }
            for k in 0..3 {
                let r = DVector::from_fn(3, |i, _| modes.right[[f, i, k]]);
                let l = DVector::from_fn(3, |i, _| modes.left[[f, k, i]]);
                assert!((&wf * &r - r.map(|x| x * values[k])).norm() < 1e-10);
                assert!((wf.transpose() * &l - l.map(|x| x * values[k])).norm() < 1e-10);
                assert!((r.norm() - 1.0).abs() < 1e-12);
                for j in 0..3 {
                    let rj = DVector::from_fn(3, |i, _| modes.right[[f, i, j]]);
                    let expected = if j == k { 1.0 } else { 0.0 };
                    assert!((l.dot(&rj) - c(expected, 0.0)).norm() < 1e-10);
                }
            }
        }
    }

    #[test]
    fn propagators_map_the_eigenvalues() {
        let w = known_spectrum();
        let base = eigenmodes(&w, EigenMatrix::EffectiveConnectivity).unwrap();
        let prop = eigenmodes(&w, EigenMatrix::Propagator).unwrap();
        let inv = eigenmodes(&w, EigenMatrix::InversePropagator).unwrap();
        let one = c(1.0, 0.0);
        for (k, lambda) in base.eigenvalues.indexed_iter() {
            assert!((prop.eigenvalues[k] - (one - lambda).inv()).norm() < 1e-12);
            assert!((inv.eigenvalues[k] - (one - lambda)).norm() < 1e-12);
        }
        assert!((prop.right.clone() - &base.right).iter().all(|d| d.norm() < 1e-14));
    }

    #[test]
    fn repeated_eigenvalues_keep_independent_modes() {
        let modes = eigenmodes(&Array3::zeros((1, 2, 2)), EigenMatrix::Propagator).unwrap();
        assert!(modes.eigenvalues.iter().all(|v| (v - c(1.0, 0.0)).norm() < 1e-15));
        let v = DMatrix::from_fn(2, 2, |i, k| modes.right[[0, i, k]]);
        assert!(v.determinant().norm() > 1e-3);
    }

    #[test]
    fn defective_and_singular_matrices_are_reported() {
        let jordan = Array3::from_shape_fn((1, 2, 2), |(_, i, j)| if j == i + 1 { c(1.0, 0.0) } else { c(0.0, 0.0) });
        assert_eq!(
            eigenmodes(&jordan, EigenMatrix::EffectiveConnectivity),
            Err(MeanFieldError::SingularMatrix { frequency_index: 0 })
        );
        let unit = Array3::from_elem((1, 1, 1), c(1.0, 0.0));
        assert!(eigenmodes(&unit, EigenMatrix::InversePropagator).is_ok());
        assert_eq!(
            eigenmodes(&unit, EigenMatrix::Propagator),
            Err(MeanFieldError::SingularMatrix { frequency_index: 0 })
        );
    }

    #[test]
    fn names_parse() {
        for matrix in EigenMatrix::ALL {
            assert_eq!(matrix.as_str().parse::<EigenMatrix>(), Ok(matrix));
        }
        assert!(matches!("MH".parse::<EigenMatrix>(), Err(MeanFieldError::InvalidFormat(_))));
    }
}
