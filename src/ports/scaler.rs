//! Scaler port: Trait for the pre-fitted feature transform.
//!
//! The transform is fitted offline; implementations only replay the fitted
//! statistics.

use crate::domain::{FeatureVector, ScaledVector};
use crate::Result;

/// Trait for a pre-fitted per-feature scaling transform.
pub trait Scaler: Send + Sync {
    /// Feature names in the order the transform was fitted on.
    fn feature_names(&self) -> &[String];

    /// Number of features the transform expects.
    fn n_features(&self) -> usize {
        self.feature_names().len()
    }

    /// Apply the fitted transform.
    ///
    /// The output has the same arity as the input.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the transform was fitted on a
    /// different number of features.
    fn transform(&self, features: &FeatureVector) -> Result<ScaledVector>;
}
