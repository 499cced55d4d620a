//! Named parameters referenced by definition operations
//!
//! Names are case-insensitive. A system file declares global parameters;
//! each body may override them locally.

use std::collections::BTreeMap;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Lookup of named values during operation resolution
pub trait ParameterLookup {
    fn scalar(&self, name: &str) -> Option<f64>;
    fn vector(&self, name: &str) -> Option<Vector3<f64>>;
    fn matrix(&self, name: &str) -> Option<Matrix3<f64>>;

    fn has_scalar(&self, name: &str) -> bool {
        self.scalar(name).is_some()
    }

    fn has_vector(&self, name: &str) -> bool {
        self.vector(name).is_some()
    }

    fn has_matrix(&self, name: &str) -> bool {
        self.matrix(name).is_some()
    }
}

/// Scalar, vector and matrix parameters keyed by lower-cased name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub scalars: BTreeMap<String, f64>,
    pub vectors: BTreeMap<String, Vector3<f64>>,
    pub matrices: BTreeMap<String, Matrix3<f64>>,
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scalar(&mut self, name: &str, value: f64) {
        self.scalars.insert(key(name), value);
    }

    pub fn set_vector(&mut self, name: &str, value: Vector3<f64>) {
        self.vectors.insert(key(name), value);
    }

    pub fn set_matrix(&mut self, name: &str, value: Matrix3<f64>) {
        self.matrices.insert(key(name), value);
    }

    pub fn with_scalar(mut self, name: &str, value: f64) -> Self {
        self.set_scalar(name, value);
        self
    }

    pub fn with_vector(mut self, name: &str, value: Vector3<f64>) -> Self {
        self.set_vector(name, value);
        self
    }

    pub fn with_matrix(mut self, name: &str, value: Matrix3<f64>) -> Self {
        self.set_matrix(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.scalars.len() + self.vectors.len() + self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of `self` with every entry of `overrides` replacing or adding
    pub fn merged(&self, overrides: &Parameters) -> Parameters {
        let mut merged = self.clone();
        merged.scalars.extend(overrides.scalars.iter().map(|(k, v)| (k.clone(), *v)));
        merged.vectors.extend(overrides.vectors.iter().map(|(k, v)| (k.clone(), *v)));
        merged.matrices.extend(overrides.matrices.iter().map(|(k, v)| (k.clone(), *v)));
        merged
    }
}

impl ParameterLookup for Parameters {
    fn scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(&key(name)).copied()
    }

    fn vector(&self, name: &str) -> Option<Vector3<f64>> {
        self.vectors.get(&key(name)).copied()
    }

    fn matrix(&self, name: &str) -> Option<Matrix3<f64>> {
        self.matrices.get(&key(name)).copied()
    }
}
