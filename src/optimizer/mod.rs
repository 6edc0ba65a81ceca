use crate::model::ParamOps;

/// Trait for gradient-based optimizers.
///
/// Optimizers update model parameters from computed gradients. Training
/// logic (`Trainer`) is decoupled from the update rule, so any model can be
/// paired with any optimizer.
///
/// # Example
/// ```rust
/// use ndarray::array;
/// use regress_forecast::model::LinearParams;
/// use regress_forecast::optimizer::{Optimizer, SGD};
///
/// let params = LinearParams { weights: array![1.0, 2.0], bias: 0.5 };
/// let grads = LinearParams { weights: array![0.1, -0.2], bias: -0.01 };
/// let updated = SGD::new(0.1).step(&params, &grads);
/// assert!((updated.weights[0] - 0.99).abs() < 1e-12);
/// ```
pub trait Optimizer<P> {
    /// Performs an optimization step:
    /// ```text
    /// params_new = params - learning_rate * gradients
    /// ```
    ///
    /// Inputs are not mutated; a new parameter set is returned.
    fn step(&self, params: &P, gradients: &P) -> P;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}

/// Plain (full-batch) gradient descent.
///
/// ```text
/// θ ← θ - η · ∇L(θ)
/// ```
#[derive(Clone, Debug)]
pub struct SGD {
    lr: f64,
}

impl SGD {
    pub fn new(lr: f64) -> Self {
        Self { lr }
    }
}

impl<P: ParamOps> Optimizer<P> for SGD {
    fn step(&self, params: &P, grads: &P) -> P {
        params.add(&grads.scale(-self.lr))
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }
}

/// Shrinks the learning rate whenever the loss goes up.
///
/// The rate is multiplied by `factor` on every increase and is never raised
/// back.
#[derive(Clone, Copy, Debug)]
pub struct LossIncreaseDecay {
    factor: f64,
}

impl LossIncreaseDecay {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Returns the reduced rate if `loss > previous_loss`.
    pub fn adjust(&self, lr: f64, previous_loss: f64, loss: f64) -> Option<f64> {
        (loss > previous_loss).then_some(lr * self.factor)
    }
}

impl Default for LossIncreaseDecay {
    fn default() -> Self {
        Self::new(0.8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearParams;
    use ndarray::array;

    #[test]
    fn test_sgd_new_initialization() {
        let sgd = SGD::new(0.05);
        assert_eq!(Optimizer::<LinearParams>::learning_rate(&sgd), 0.05);
    }

    #[test]
    fn test_sgd_step() {
        let params = LinearParams {
            weights: array![1.0, -1.0],
            bias: 2.0,
        };
        let grads = LinearParams {
            weights: array![10.0, -10.0],
            bias: 1.0,
        };
        let updated = SGD::new(0.1).step(&params, &grads);
        assert_eq!(updated.weights, array![0.0, 0.0]);
        assert!((updated.bias - 1.9).abs() < 1e-12);
        // inputs untouched
        assert_eq!(params.bias, 2.0);
    }

    #[test]
    fn test_sgd_zero_gradients_is_noop() {
        let params = LinearParams {
            weights: array![3.0],
            bias: 4.0,
        };
        let updated = SGD::new(0.5).step(&params, &LinearParams::zeros(1));
        assert_eq!(updated, params);
    }

    #[test]
    fn test_sgd_set_learning_rate() {
        let mut sgd = SGD::new(0.1);
        Optimizer::<LinearParams>::set_learning_rate(&mut sgd, 0.08);
        assert_eq!(Optimizer::<LinearParams>::learning_rate(&sgd), 0.08);
    }

    #[test]
    fn test_decay_only_on_increase() {
        let decay = LossIncreaseDecay::default();
        assert_eq!(decay.adjust(0.1, 1.0, 0.5), None);
        assert_eq!(decay.adjust(0.1, 1.0, 1.0), None);
        let reduced = decay.adjust(0.1, 1.0, 1.5).unwrap();
        assert!((reduced - 0.08).abs() < 1e-15);
    }
}
