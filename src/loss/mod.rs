use ndarray::{Array1, ArrayView1};

/// A differentiable loss function used during model training.
///
/// Implementors define:
/// - How to compute the scalar loss value (for logging and stopping rules).
/// - How to compute the gradient of the loss w.r.t. the model's predictions.
///
/// The gradient is passed to the model's `backward()` method.
pub trait Loss {
    fn loss(&self, prediction: ArrayView1<'_, f64>, target: ArrayView1<'_, f64>) -> f64;

    /// Gradient of the loss w.r.t. the prediction: ∂L/∂pred.
    fn grad_wrt_prediction(
        &self,
        prediction: ArrayView1<'_, f64>,
        target: ArrayView1<'_, f64>,
    ) -> Array1<f64>;
}

/// Mean Squared Error (MSE) loss: `L = (1/n) * Σ(pred_i - target_i)^2`
///
/// Gradient w.r.t. prediction: `(pred - target) / n`
///
/// The factor of 2 is omitted from the gradient and absorbed into the
/// learning rate, so `backward` yields the mean residual gradients.
#[derive(Clone, Copy, Debug, Default)]
pub struct MSELoss;

impl Loss for MSELoss {
    fn loss(&self, pred: ArrayView1<'_, f64>, target: ArrayView1<'_, f64>) -> f64 {
        let diff = &pred - &target;
        diff.dot(&diff) / diff.len() as f64
    }

    fn grad_wrt_prediction(
        &self,
        pred: ArrayView1<'_, f64>,
        target: ArrayView1<'_, f64>,
    ) -> Array1<f64> {
        (&pred - &target) / pred.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse_loss_value() {
        let pred = array![1.0, 2.0, 3.0];
        let target = array![1.0, 4.0, 0.0];
        // (0 + 4 + 9) / 3
        let loss = MSELoss.loss(pred.view(), target.view());
        assert!((loss - 13.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mse_loss_zero_on_perfect_prediction() {
        let y = array![0.5, -1.5];
        assert_eq!(MSELoss.loss(y.view(), y.view()), 0.0);
    }

    #[test]
    fn test_mse_grad_is_mean_residual() {
        let pred = array![2.0, 0.0];
        let target = array![1.0, 1.0];
        let grad = MSELoss.grad_wrt_prediction(pred.view(), target.view());
        assert_eq!(grad, array![0.5, -0.5]);
    }
}
