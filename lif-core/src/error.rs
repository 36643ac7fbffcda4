//! Error type shared by the mean-field crates.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeanFieldError {
    /// Gauss-Legendre order search ran out of doublings.
    #[error("quadrature did not converge after {iterations} iterations (last relative error {rel_error:e})")]
    QuadratureConvergence { iterations: usize, rel_error: f64 },

    #[error("firing rates did not converge after {iterations} iterations (last change {max_change:e})")]
    FixpointConvergence { iterations: usize, max_change: f64 },

    #[error("division by zero: {name} must be nonzero")]
    DivisionByZero { name: &'static str },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("shape mismatch for {name}: expected {expected}, got {actual}")]
    ShapeMismatch { name: String, expected: usize, actual: usize },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("missing result: compute {0} first")]
    MissingResult(String),

    #[error("singular matrix (I - W) at frequency index {frequency_index}")]
    SingularMatrix { frequency_index: usize },
}

impl MeanFieldError {
    #[must_use]
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name, reason: reason.into() }
    }

    #[must_use]
    pub fn shape(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch { name: name.into(), expected, actual }
    }
}

pub type MeanFieldResult<T, E = MeanFieldError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            MeanFieldError::DivisionByZero { name: "sigma" }.to_string(),
            "division by zero: sigma must be nonzero"
        );
        assert_eq!(
            MeanFieldError::invalid("tau_m", "must be positive").to_string(),
            "invalid parameter tau_m: must be positive"
        );
        assert_eq!(
            MeanFieldError::shape("mu", 3, 2).to_string(),
            "shape mismatch for mu: expected 3, got 2"
        );
        assert_eq!(
            MeanFieldError::MissingResult("lif.exp.mean_input".into()).to_string(),
            "missing result: compute lif.exp.mean_input first"
        );
    }

    #[test]
    fn convergence_error_names_last_error() {
        let err = MeanFieldError::QuadratureConvergence { iterations: 2, rel_error: 1.5e-3 };
        let msg = err.to_string();
        assert!(msg.contains("2 iterations"));
        assert!(msg.contains("1.5e-3"));
    }
}
