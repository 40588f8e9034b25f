//! Classifier port: Trait for the pre-fitted binary classifier.

use crate::domain::ScaledVector;
use crate::Result;

/// Trait for a binary classifier over scaled features.
///
/// Implementations provide:
/// - A hard label for every input
/// - Optionally, a class probability pair
pub trait Classifier: Send + Sync {
    /// Feature names in the order the classifier was fitted on.
    fn feature_names(&self) -> &[String];

    /// Expected input width.
    fn n_features(&self) -> usize {
        self.feature_names().len()
    }

    /// Predict the class label (`true` = positive class).
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the input width is wrong.
    fn predict(&self, x: &ScaledVector) -> Result<bool>;

    /// Predict `(p0, p1)` with `p0 + p1 = 1`.
    ///
    /// # Returns
    /// `None` if the classifier has no probabilistic output.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the input width is wrong.
    fn predict_probabilities(&self, x: &ScaledVector) -> Result<Option<(f64, f64)>>;
}
