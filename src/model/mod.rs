//! Models with compile-time training state.
//!
//! A model starts as `Model<Unfitted>`, is driven by the trainer through
//! [`TrainableModel`], and is converted into `Model<Fitted>`, which only
//! implements [`InferenceModel`].

use crate::error::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};

pub mod linear;
pub mod state;

pub use linear::{LinearModel, LinearParams, LinearRegression};
pub use state::{Fitted, Unfitted};

/// Training-time interface: forward pass, gradients, parameter updates.
pub trait TrainableModel {
    type Params: ParamOps;
    type Output;

    /// Number of input features the model expects.
    fn n_inputs(&self) -> usize;

    /// Predictions for every row of `x`.
    fn forward(&self, x: ArrayView2<'_, f64>) -> Array1<f64>;

    /// Gradients of the loss w.r.t. the parameters, given the loss gradient
    /// w.r.t. the predictions.
    fn backward(&self, x: ArrayView2<'_, f64>, grad_output: ArrayView1<'_, f64>) -> Self::Params;

    fn params(&self) -> &Self::Params;

    fn update_params(&mut self, params: Self::Params);

    fn into_fitted(self) -> Self::Output;
}

/// Arithmetic needed by optimizers on parameter sets.
pub trait ParamOps: Clone {
    fn add(&self, other: &Self) -> Self;
    fn scale(&self, factor: f64) -> Self;
    /// `false` if any parameter is NaN or infinite.
    fn is_finite(&self) -> bool;
}

/// Inference-time interface of a fitted model.
///
/// Inputs must already be standardized with the parameters the model was
/// trained with; inference never rescales.
pub trait InferenceModel {
    fn predict_one(&self, features: &[f64]) -> Result<f64>;

    fn predict_batch(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}
