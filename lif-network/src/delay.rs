//! Fourier factors of synaptic delay distributions.

use std::f64::consts::FRAC_1_SQRT_2;

use lif_core::{erfc, faddeeva, MeanFieldError, MeanFieldResult};
use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayDistribution {
    /// Fixed delay, pure phase factor.
    #[default]
    None,
    /// Gaussian truncated at zero delay.
    TruncatedGaussian,
    Gaussian,
}

impl std::str::FromStr for DelayDistribution {
    type Err = MeanFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "truncated_gaussian" => Ok(Self::TruncatedGaussian),
            "gaussian" => Ok(Self::Gaussian),
            other => Err(MeanFieldError::InvalidFormat(format!("unknown delay distribution {other:?}"))),
        }
    }
}

impl DelayDistribution {
    /// Characteristic function at `omega` for delays of mean `mean` and spread `std`.
    pub fn factor(self, omega: f64, mean: f64, std: f64) -> Complex64 {
        let phase = Complex64::new(0.0, -omega * mean).exp();
        match self {
            DelayDistribution::None => phase,
            _ if std == 0.0 => phase,
            DelayDistribution::Gaussian => phase * (-0.5 * (std * omega).powi(2)).exp(),
            DelayDistribution::TruncatedGaussian => {
                let gaussian = phase * (-0.5 * (std * omega).powi(2)).exp();
                let arg = Complex64::new(std * omega, mean / std) * FRAC_1_SQRT_2;
                let tail = (-0.5 * (mean / std).powi(2)).exp() * faddeeva(arg);
                (2.0 * gaussian - tail) / erfc(-mean / std * FRAC_1_SQRT_2)
            }
        }
    }
}

/// Delay factors `D[frequency, post, pre]` for mean and spread matrices in seconds.
pub fn delay_distribution_matrix(
    mean: &Array2<f64>,
    std: &Array2<f64>,
    distribution: DelayDistribution,
    omegas: &Array1<f64>,
) -> MeanFieldResult<Array3<Complex64>> {
    if mean.dim() != std.dim() {
        return Err(MeanFieldError::shape("Delay_sd", mean.len(), std.len()));
    }
    if std.iter().any(|&s| s < 0.0) {
        return Err(MeanFieldError::invalid("Delay_sd", "must be non-negative"));
    }
    let (rows, cols) = mean.dim();
    Ok(Array3::from_shape_fn((omegas.len(), rows, cols), |(w, i, j)| {
        distribution.factor(omegas[w], mean[[i, j]], std[[i, j]])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn assert_close(a: Complex64, b: Complex64, tol: f64) {
        assert!((a - b).norm() <= tol * b.norm().max(1e-300), "{a} vs {b}");
    }

    #[test]
    fn all_distributions_are_normalized_at_zero_frequency() {
        for dist in [DelayDistribution::None, DelayDistribution::Gaussian, DelayDistribution::TruncatedGaussian] {
            assert_close(dist.factor(0.0, 1.5e-3, 0.75e-3), Complex64::new(1.0, 0.0), 1e-13);
        }
    }

    #[test]
    fn gaussian_damps_the_phase_factor() {
        let (omega, d, s) = (200.0, 1.5e-3, 0.75e-3);
        let g = DelayDistribution::Gaussian.factor(omega, d, s);
        assert_relative_eq!(g.norm(), (-0.5 * (s * omega).powi(2)).exp(), max_relative = 1e-14);
        assert_relative_eq!(g.arg(), -omega * d, max_relative = 1e-12);
    }

    #[test]
    fn narrow_truncated_gaussian_approaches_gaussian() {
        // truncation at zero is negligible ten standard deviations away
        let (omega, d, s) = (300.0, 2e-3, 0.2e-3);
        let t = DelayDistribution::TruncatedGaussian.factor(omega, d, s);
        let g = DelayDistribution::Gaussian.factor(omega, d, s);
        assert_close(t, g, 1e-12);
    }

    #[test]
    fn truncated_gaussian_has_larger_mean_delay() {
        // mean of a Gaussian truncated at zero exceeds its location; the phase
        // slope at small omega gives minus the mean
        let (d, s, h) = (1e-3, 1e-3, 1e-2);
        let t = DelayDistribution::TruncatedGaussian.factor(h, d, s);
        assert!(-t.arg() / h > d);
    }

    #[test]
    fn matrix_shape_and_validation() {
        let mean = array![[1e-3, 2e-3], [1.5e-3, 1e-3]];
        let std = mean.mapv(|m| m / 2.0);
        let omegas = array![0.0, 10.0, 100.0];
        let d = delay_distribution_matrix(&mean, &std, DelayDistribution::Gaussian, &omegas).unwrap();
        assert_eq!(d.dim(), (3, 2, 2));
        assert_close(d[[2, 0, 1]], DelayDistribution::Gaussian.factor(100.0, 2e-3, 1e-3), 1e-15);
        assert!(delay_distribution_matrix(&mean, &array![[1e-3]], DelayDistribution::None, &omegas).is_err());
        assert_eq!("truncated_gaussian".parse::<DelayDistribution>(), Ok(DelayDistribution::TruncatedGaussian));
        assert!("lognormal".parse::<DelayDistribution>().is_err());
    }
}
