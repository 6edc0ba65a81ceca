//! Feature standardization (Z-score normalization).
//!
//! Transforms features by removing the mean and scaling to unit variance:
//! ```text
//! z = (x - u) / s
//! ```
//! where `u` is the mean of the training samples and `s` their population
//! standard deviation. Constant columns get `s = 1`, so they are only centered.
//!
//! # Example
//! ```rust
//! use ndarray::array;
//! use regress_forecast::preprocessing::{FeatureStandardizer, FittedTransformer, Transformer};
//!
//! let train = array![[1.0, 10.0], [3.0, 10.0]];
//! let params = FeatureStandardizer::new().fit(train.view()).unwrap();
//! let scaled = params.transform(train.view()).unwrap();
//! assert_eq!(scaled, array![[-1.0, 0.0], [1.0, 0.0]]);
//! ```

use crate::error::{EngineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Standard deviations at or below this are treated as zero.
const MIN_STD: f64 = 1e-12;

/// Learned statistics of one feature column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: f64,
    pub std: f64,
}

/// Fitted standardization parameters, one entry per feature in column order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardizationParams {
    pub features: Vec<FeatureStats>,
}

impl StandardizationParams {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn means(&self) -> Array1<f64> {
        self.features.iter().map(|s| s.mean).collect()
    }

    pub fn stds(&self) -> Array1<f64> {
        self.features.iter().map(|s| s.std).collect()
    }

    /// Standardizes a single feature vector.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(&self.features)
            .map(|(x, s)| (x - s.mean) / s.std)
            .collect())
    }

    fn check_width(&self, got: usize) -> Result<()> {
        if got != self.features.len() {
            return Err(EngineError::invalid(format!(
                "feature mismatch: expected {} features, got {}",
                self.features.len(),
                got
            )));
        }
        Ok(())
    }
}

impl FittedTransformer for StandardizationParams {
    fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        Ok((&data - &self.means()) / &self.stds())
    }

    fn inverse_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        Ok(&data * &self.stds() + &self.means())
    }

    fn n_features_in(&self) -> usize {
        self.features.len()
    }
}

/// Unfitted standardizer.
#[derive(Clone, Debug, Default)]
pub struct FeatureStandardizer;

impl FeatureStandardizer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for FeatureStandardizer {
    type Fitted = StandardizationParams;

    fn fit(&self, data: ArrayView2<'_, f64>) -> Result<StandardizationParams> {
        if data.nrows() == 0 {
            return Err(EngineError::invalid(
                "cannot fit standardizer on empty training features",
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::invalid(
                "training features contain non-finite values",
            ));
        }

        let n = data.nrows() as f64;
        let features = data
            .axis_iter(Axis(1))
            .map(|col| {
                let mean = col.sum() / n;
                let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                FeatureStats {
                    mean,
                    std: if std <= MIN_STD { 1.0 } else { std },
                }
            })
            .collect();

        Ok(StandardizationParams { features })
    }
}
