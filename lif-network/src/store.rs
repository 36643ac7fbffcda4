//! Named parameters and cached results.
//!
//! Computations in [`crate::pipeline`] read their inputs by name from a
//! [`ParameterSource`] and earlier outputs from a [`ResultCache`], and store
//! what they compute back under `lif.exp.<quantity>`.

use std::collections::BTreeMap;

use lif_core::{MeanFieldError, MeanFieldResult};
use ndarray::{Array1, Array2, Array3, ArrayD};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// A stored value. Units are SI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Scalar(f64),
    Text(String),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
    ComplexMatrix(Array2<Complex64>),
    ComplexTensor(Array3<Complex64>),
    ComplexArray(ArrayD<Complex64>),
}

impl Quantity {
    fn kind(&self) -> &'static str {
        match self {
            Quantity::Scalar(_) => "scalar",
            Quantity::Text(_) => "text",
            Quantity::Vector(_) => "vector",
            Quantity::Matrix(_) => "matrix",
            Quantity::ComplexMatrix(_) => "complex matrix",
            Quantity::ComplexTensor(_) => "complex tensor",
            Quantity::ComplexArray(_) => "complex array",
        }
    }

    fn mismatch(&self, name: &str, expected: &str) -> MeanFieldError {
        MeanFieldError::InvalidFormat(format!("{name} is a {}, expected {expected}", self.kind()))
    }

    pub fn as_scalar(&self, name: &str) -> MeanFieldResult<f64> {
        match self {
            Quantity::Scalar(v) => Ok(*v),
            other => Err(other.mismatch(name, "scalar")),
        }
    }

    pub fn as_text(&self, name: &str) -> MeanFieldResult<&str> {
        match self {
            Quantity::Text(s) => Ok(s),
            other => Err(other.mismatch(name, "text")),
        }
    }

    /// Scalars become vectors of length one.
    pub fn to_vector(&self, name: &str) -> MeanFieldResult<Array1<f64>> {
        match self {
            Quantity::Scalar(v) => Ok(Array1::from_elem(1, *v)),
            Quantity::Vector(v) => Ok(v.clone()),
            other => Err(other.mismatch(name, "vector")),
        }
    }

    pub fn as_matrix(&self, name: &str) -> MeanFieldResult<&Array2<f64>> {
        match self {
            Quantity::Matrix(m) => Ok(m),
            other => Err(other.mismatch(name, "matrix")),
        }
    }

    pub fn as_complex_matrix(&self, name: &str) -> MeanFieldResult<&Array2<Complex64>> {
        match self {
            Quantity::ComplexMatrix(m) => Ok(m),
            other => Err(other.mismatch(name, "complex matrix")),
        }
    }

    pub fn as_complex_tensor(&self, name: &str) -> MeanFieldResult<&Array3<Complex64>> {
        match self {
            Quantity::ComplexTensor(t) => Ok(t),
            other => Err(other.mismatch(name, "complex tensor")),
        }
    }

    /// Any complex array, with its rank kept.
    pub fn to_complex_array(&self, name: &str) -> MeanFieldResult<ArrayD<Complex64>> {
        match self {
            Quantity::ComplexMatrix(m) => Ok(m.clone().into_dyn()),
            Quantity::ComplexTensor(t) => Ok(t.clone().into_dyn()),
            Quantity::ComplexArray(a) => Ok(a.clone()),
            other => Err(other.mismatch(name, "complex array")),
        }
    }
}

pub trait ParameterSource {
    fn get_parameter(&self, name: &str) -> Option<&Quantity>;

    fn parameter(&self, name: &str) -> MeanFieldResult<&Quantity> {
        self.get_parameter(name)
            .ok_or_else(|| MeanFieldError::MissingParameter(name.to_string()))
    }
}

pub trait ResultCache {
    fn get_result(&self, key: &str) -> Option<&Quantity>;

    fn store_result(&mut self, key: &str, value: Quantity);

    fn remove_result(&mut self, key: &str) -> Option<Quantity>;

    fn result(&self, key: &str) -> MeanFieldResult<&Quantity> {
        self.get_result(key)
            .ok_or_else(|| MeanFieldError::MissingResult(key.to_string()))
    }
}

/// In-memory parameters and results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    parameters: BTreeMap<String, Quantity>,
    results: BTreeMap<String, Quantity>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: &str, value: Quantity) -> Self {
        self.set_parameter(name, value);
        self
    }

    /// Changing a parameter invalidates every cached result.
    pub fn set_parameter(&mut self, name: &str, value: Quantity) {
        self.parameters.insert(name.to_string(), value);
        self.results.clear();
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    pub fn result_keys(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }
}

impl ParameterSource for MemoryStore {
    fn get_parameter(&self, name: &str) -> Option<&Quantity> {
        self.parameters.get(name)
    }
}

impl ResultCache for MemoryStore {
    fn get_result(&self, key: &str) -> Option<&Quantity> {
        self.results.get(key)
    }

    fn store_result(&mut self, key: &str, value: Quantity) {
        self.results.insert(key.to_string(), value);
    }

    fn remove_result(&mut self, key: &str) -> Option<Quantity> {
        self.results.remove(key)
    }
}
