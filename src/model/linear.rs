//! Linear regression: `y = w^T x + b`.
//!
//! - [`LinearRegression`] = `LinearModel<Unfitted>` — used during training.
//! - `LinearModel<Fitted>` — inference only.

use crate::error::{EngineError, Result};
use crate::model::{Fitted, InferenceModel, ParamOps, TrainableModel, Unfitted};
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::marker::PhantomData;

/// Trainable parameters of a linear model: weights and bias.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearParams {
    pub weights: Array1<f64>,
    pub bias: f64,
}

impl LinearParams {
    pub fn zeros(n_features: usize) -> Self {
        Self {
            weights: Array1::zeros(n_features),
            bias: 0.0,
        }
    }
}

impl ParamOps for LinearParams {
    fn add(&self, other: &Self) -> Self {
        Self {
            weights: &self.weights + &other.weights,
            bias: self.bias + other.bias,
        }
    }

    fn scale(&self, factor: f64) -> Self {
        Self {
            weights: &self.weights * factor,
            bias: self.bias * factor,
        }
    }

    fn is_finite(&self) -> bool {
        self.bias.is_finite() && self.weights.iter().all(|w| w.is_finite())
    }
}

/// A linear model with state encoded at the type level.
///
/// This enforces, at compile time, that `predict_one()` cannot be called on
/// an untrained model.
#[derive(Clone, Debug)]
pub struct LinearModel<S> {
    params: LinearParams,
    _state: PhantomData<S>,
}

/// Alias for an unfitted linear regression model.
pub type LinearRegression = LinearModel<Unfitted>;

impl LinearRegression {
    /// Creates a model with zero-initialized weights and bias.
    pub fn new(n_features: usize) -> Self {
        Self::from_params(LinearParams::zeros(n_features))
    }

    /// Constructs a model from explicit parameters (e.g. for a warm start).
    pub fn from_params(params: LinearParams) -> Self {
        Self {
            params,
            _state: PhantomData,
        }
    }
}

impl LinearModel<Fitted> {
    pub fn new(params: LinearParams) -> Self {
        Self {
            params,
            _state: PhantomData,
        }
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.params.weights
    }

    pub fn intercept(&self) -> f64 {
        self.params.bias
    }

    pub fn n_features(&self) -> usize {
        self.params.weights.len()
    }
}

impl TrainableModel for LinearRegression {
    type Params = LinearParams;
    type Output = LinearModel<Fitted>;

    fn n_inputs(&self) -> usize {
        self.params.weights.len()
    }

    fn forward(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&self.params.weights) + self.params.bias
    }

    fn backward(&self, x: ArrayView2<'_, f64>, grad_output: ArrayView1<'_, f64>) -> LinearParams {
        LinearParams {
            weights: x.t().dot(&grad_output),
            bias: grad_output.sum(),
        }
    }

    fn params(&self) -> &LinearParams {
        &self.params
    }

    fn update_params(&mut self, params: LinearParams) {
        self.params = params;
    }

    fn into_fitted(self) -> LinearModel<Fitted> {
        LinearModel::<Fitted>::new(self.params)
    }
}

impl InferenceModel for LinearModel<Fitted> {
    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features() {
            return Err(EngineError::invalid(format!(
                "expected {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }
        Ok(self.params.bias
            + self
                .params
                .weights
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>())
    }

    fn predict_batch(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.n_features() {
            return Err(EngineError::invalid(format!(
                "expected {} feature columns, got {}",
                self.n_features(),
                features.ncols()
            )));
        }
        Ok(features.dot(&self.params.weights) + self.params.bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fitted(weights: Array1<f64>, bias: f64) -> LinearModel<Fitted> {
        LinearModel::<Fitted>::new(LinearParams { weights, bias })
    }

    #[test]
    fn test_param_ops_add() {
        let p1 = LinearParams {
            weights: array![1.0, 2.0],
            bias: 0.5,
        };
        let p2 = LinearParams {
            weights: array![0.5, 1.0],
            bias: 0.5,
        };
        let result = p1.add(&p2);
        assert_eq!(result.weights, array![1.5, 3.0]);
        assert_eq!(result.bias, 1.0);
    }

    #[test]
    fn test_param_ops_scale_negative() {
        let p = LinearParams {
            weights: array![2.0],
            bias: 1.0,
        };
        let result = p.scale(-1.0);
        assert_eq!(result.weights, array![-2.0]);
        assert_eq!(result.bias, -1.0);
    }

    #[test]
    fn test_param_ops_is_finite() {
        let mut p = LinearParams::zeros(2);
        assert!(p.is_finite());
        p.weights[1] = f64::NAN;
        assert!(!p.is_finite());
        let p = LinearParams {
            weights: array![1.0],
            bias: f64::INFINITY,
        };
        assert!(!p.is_finite());
    }

    #[test]
    fn test_linear_regression_new_zero_initialized() {
        let model = LinearRegression::new(3);
        assert_eq!(model.params().weights, array![0.0, 0.0, 0.0]);
        assert_eq!(model.params().bias, 0.0);
    }

    #[test]
    fn test_linear_regression_forward_correctness() {
        let model = LinearRegression::from_params(LinearParams {
            weights: array![2.0, 3.0],
            bias: 1.0,
        });
        // [[1, 0], [0, 1]] -> [2 + 1, 3 + 1]
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        assert_eq!(model.forward(x.view()), array![3.0, 4.0]);
    }

    #[test]
    fn test_linear_regression_backward_batch() {
        let model = LinearRegression::new(2);
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let grad_output = array![0.5, 0.25];

        let grads = model.backward(x.view(), grad_output.view());

        // X^T @ grad = [1*0.5 + 3*0.25, 2*0.5 + 4*0.25]
        assert!((grads.weights[0] - 1.25).abs() < 1e-12);
        assert!((grads.weights[1] - 2.0).abs() < 1e-12);
        assert!((grads.bias - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_linear_model_into_fitted_keeps_params() {
        let model = LinearRegression::from_params(LinearParams {
            weights: array![1.0],
            bias: 0.5,
        });
        let fitted = model.into_fitted();
        assert_eq!(fitted.coefficients(), &array![1.0]);
        assert_eq!(fitted.intercept(), 0.5);
    }

    #[test]
    fn test_predict_one() {
        let model = fitted(array![2.0, 3.0], 1.0);
        // 2*1 + 3*2 + 1
        assert_eq!(model.predict_one(&[1.0, 2.0]).unwrap(), 9.0);
    }

    #[test]
    fn test_predict_one_negative_weights() {
        let model = fitted(array![-1.0, -2.0], 5.0);
        assert_eq!(model.predict_one(&[1.0, 1.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_predict_one_wrong_width() {
        let model = fitted(array![1.0, 1.0], 0.0);
        let err = model.predict_one(&[1.0]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_predict_batch_matches_predict_one() {
        let model = fitted(array![1.0, 2.0], 3.0);
        let batch = array![[1.0, 1.0], [2.0, 2.0], [-1.0, 0.5]];
        let preds = model.predict_batch(batch.view()).unwrap();
        assert_eq!(preds, array![6.0, 9.0, 3.0]);
        for (row, pred) in batch.rows().into_iter().zip(preds.iter()) {
            assert_eq!(model.predict_one(&row.to_vec()).unwrap(), *pred);
        }
    }

    #[test]
    fn test_predict_batch_wrong_width() {
        let model = fitted(array![1.0], 0.0);
        assert!(model.predict_batch(array![[1.0, 2.0]].view()).is_err());
    }
}
