//! Core traits for preprocessing transformers.
//!
//! - [`Transformer`]: Used during fitting; has hyperparameters and learns from data.
//! - [`FittedTransformer`]: After fitting; applies the learned parameters.

use crate::error::Result;
use ndarray::{Array2, ArrayView2};

/// Trait for unfitted transformers with hyperparameters.
///
/// A transformer learns parameters from training data and can then transform
/// new data using those learned parameters. This trait represents the
/// configurable, unfitted state.
pub trait Transformer: Clone {
    /// The fitted transformer type ready for inference.
    type Fitted: FittedTransformer;

    /// Fit the transformer to the training data.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidInput`](crate::error::EngineError) if the
    /// data is empty or contains non-finite values.
    fn fit(&self, data: ArrayView2<'_, f64>) -> Result<Self::Fitted>;

    /// Fit the transformer and transform the same data in one step.
    fn fit_transform(&self, data: ArrayView2<'_, f64>) -> Result<(Self::Fitted, Array2<f64>)> {
        let fitted = self.fit(data)?;
        let transformed = fitted.transform(data)?;
        Ok((fitted, transformed))
    }
}

/// Trait for fitted transformers ready for inference.
///
/// A fitted transformer is immutable: transforming never re-fits.
pub trait FittedTransformer: Clone {
    /// Transform data using learned parameters.
    ///
    /// # Errors
    /// Fails if the number of columns differs from the number seen during fit.
    fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Reverse the transformation.
    fn inverse_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Returns the number of features seen during fit.
    fn n_features_in(&self) -> usize;
}
