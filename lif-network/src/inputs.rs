//! Mean and variance of the summed synaptic input (Fourcaud & Brunel 2002).

use lif_core::{equalize_shape, MeanFieldError, MeanFieldResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Recurrent and external connectivity. Matrices are indexed `[post, pre]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connectivity {
    /// Weights J in V.
    pub weights: Array2<f64>,
    /// Indegrees K.
    pub indegrees: Array2<f64>,
    pub ext_weights: Array2<f64>,
    pub ext_indegrees: Array2<f64>,
    /// Rates of the external populations in Hz.
    pub ext_rates: Array1<f64>,
    /// Membrane time constant scaling the external drive, per target
    /// population or a single value for all.
    pub ext_tau_m: Array1<f64>,
}

impl Connectivity {
    /// Number of populations, after checking that all shapes agree.
    pub fn populations(&self) -> MeanFieldResult<usize> {
        let n = self.weights.nrows();
        check_dim("J", self.weights.dim(), (n, n))?;
        check_dim("K", self.indegrees.dim(), (n, n))?;
        let n_ext = self.ext_rates.len();
        check_dim("J_ext", self.ext_weights.dim(), (n, n_ext))?;
        check_dim("K_ext", self.ext_indegrees.dim(), (n, n_ext))?;
        equalize_shape("tau_m_ext", &self.ext_tau_m, n)?;
        Ok(n)
    }
}

fn check_dim(name: &str, actual: (usize, usize), expected: (usize, usize)) -> MeanFieldResult<()> {
    if actual.0 != expected.0 {
        return Err(MeanFieldError::shape(format!("{name} rows"), expected.0, actual.0));
    }
    if actual.1 != expected.1 {
        return Err(MeanFieldError::shape(format!("{name} columns"), expected.1, actual.1));
    }
    Ok(())
}

fn rates_for(conn: &Connectivity, rates: &Array1<f64>) -> MeanFieldResult<usize> {
    let n = conn.populations()?;
    if rates.len() != n {
        return Err(MeanFieldError::shape("firing rates", n, rates.len()));
    }
    Ok(n)
}

/// `mu_i = tau_m_i sum_j J_ij K_ij nu_j + tau_m_ext_i sum_k J_ext_ik K_ext_ik nu_ext_k`
pub fn mean_input(conn: &Connectivity, tau_m: &Array1<f64>, rates: &Array1<f64>) -> MeanFieldResult<Array1<f64>> {
    let n = rates_for(conn, rates)?;
    let tau_m = equalize_shape("tau_m", tau_m, n)?;
    let ext_tau_m = equalize_shape("tau_m_ext", &conn.ext_tau_m, n)?;
    let recurrent = (&conn.weights * &conn.indegrees).dot(rates);
    let external = (&conn.ext_weights * &conn.ext_indegrees).dot(&conn.ext_rates);
    Ok(tau_m * recurrent + ext_tau_m * external)
}

/// Square root of
/// `tau_m_i sum_j J_ij^2 K_ij nu_j + tau_m_ext_i sum_k J_ext_ik^2 K_ext_ik nu_ext_k`.
pub fn std_input(conn: &Connectivity, tau_m: &Array1<f64>, rates: &Array1<f64>) -> MeanFieldResult<Array1<f64>> {
    let n = rates_for(conn, rates)?;
    let tau_m = equalize_shape("tau_m", tau_m, n)?;
    let ext_tau_m = equalize_shape("tau_m_ext", &conn.ext_tau_m, n)?;
    let recurrent = (conn.weights.mapv(|j| j * j) * &conn.indegrees).dot(rates);
    let external = (conn.ext_weights.mapv(|j| j * j) * &conn.ext_indegrees).dot(&conn.ext_rates);
    Ok((tau_m * recurrent + ext_tau_m * external).mapv(f64::sqrt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn two_populations() -> Connectivity {
        Connectivity {
            weights: array![[1e-4, -5e-4], [1e-4, -5e-4]],
            indegrees: array![[400.0, 100.0], [400.0, 100.0]],
            ext_weights: array![[1e-4], [1e-4]],
            ext_indegrees: array![[1000.0], [900.0]],
            ext_rates: array![10.0],
            ext_tau_m: array![0.01],
        }
    }

    #[test]
    fn mean_input_sums_recurrent_and_external_drive() {
        let conn = two_populations();
        let mu = mean_input(&conn, &array![0.01], &array![5.0, 10.0]).unwrap();
        // 0.01 * (1e-4*400*5 - 5e-4*100*10 + 1e-4*1000*10)
        assert_relative_eq!(mu[0], 0.01 * (0.2 - 0.5 + 1.0), max_relative = 1e-12);
        assert_relative_eq!(mu[1], 0.01 * (0.2 - 0.5 + 0.9), max_relative = 1e-12);
    }

    #[test]
    fn std_input_uses_squared_weights() {
        let conn = two_populations();
        let sigma = std_input(&conn, &array![0.01, 0.02], &array![5.0, 10.0]).unwrap();
        let var0 = 0.01_f64 * (1e-8 * 400.0 * 5.0 + 25e-8 * 100.0 * 10.0 + 1e-8 * 1000.0 * 10.0);
        let var1 = 0.02_f64 * (1e-8 * 400.0 * 5.0 + 25e-8 * 100.0 * 10.0 + 1e-8 * 900.0 * 10.0);
        assert_relative_eq!(sigma[0], var0.sqrt(), max_relative = 1e-12);
        assert_relative_eq!(sigma[1], var1.sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn external_drive_has_its_own_time_constant() {
        let mut conn = two_populations();
        conn.ext_tau_m = array![0.02, 0.005];
        let rates = array![5.0, 10.0];
        let mu = mean_input(&conn, &array![0.01], &rates).unwrap();
        assert_relative_eq!(mu[0], 0.01 * (0.2 - 0.5) + 0.02 * 1.0, max_relative = 1e-12);
        assert_relative_eq!(mu[1], 0.01 * (0.2 - 0.5) + 0.005 * 0.9, max_relative = 1e-12);
        let sigma = std_input(&conn, &array![0.01], &rates).unwrap();
        let var0 = 0.01_f64 * (1e-8 * 400.0 * 5.0 + 25e-8 * 100.0 * 10.0) + 0.02 * 1e-8 * 1000.0 * 10.0;
        assert_relative_eq!(sigma[0], var0.sqrt(), max_relative = 1e-12);

        conn.ext_tau_m = array![0.01, 0.01, 0.01];
        assert_eq!(conn.populations(), Err(MeanFieldError::shape("tau_m_ext", 2, 3)));
    }

    #[test]
    fn shapes_are_checked() {
        let mut conn = two_populations();
        assert_eq!(
            mean_input(&conn, &array![0.01], &array![5.0]),
            Err(MeanFieldError::shape("firing rates", 2, 1))
        );
        conn.ext_indegrees = array![[1000.0, 1.0], [900.0, 1.0]];
        assert!(matches!(conn.populations(), Err(MeanFieldError::ShapeMismatch { .. })));
    }
}
