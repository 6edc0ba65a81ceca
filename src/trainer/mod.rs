use crate::config::TrainingConfig;
use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use crate::loss::{Loss, MSELoss};
use crate::model::{ParamOps, TrainableModel};
use crate::optimizer::{LossIncreaseDecay, Optimizer, SGD};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Why a training run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Loss fell below the configured threshold.
    LossBelowThreshold,
    /// Consecutive losses stopped changing.
    LossPlateau,
    /// The iteration budget ran out.
    MaxIterations,
}

/// Record of one training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Mean squared loss of every iteration, measured before its update.
    pub losses: Vec<f64>,
    pub learning_rate_reductions: usize,
    pub final_learning_rate: f64,
    pub stop_reason: StopReason,
}

impl TrainingHistory {
    pub fn iterations(&self) -> usize {
        self.losses.len()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }
}

/// A fitted model together with its training history.
#[derive(Clone, Debug)]
pub struct TrainingOutcome<M> {
    pub model: M,
    pub history: TrainingHistory,
}

/// Full-batch gradient-descent trainer.
///
/// Combines a loss function and an optimizer with the stopping rules:
/// - the loss drops below `loss_threshold`, or
/// - after `warmup_iterations`, consecutive losses differ by less than
///   `min_loss_delta`, or
/// - `max_iterations` is reached.
///
/// Whenever an iteration's loss is higher than the previous one, the
/// learning rate is multiplied by the decay factor. The optimizer is cloned
/// at the start of every `fit`, so a trainer can be reused and always
/// starts from its configured learning rate.
pub struct Trainer<L, O> {
    pub(crate) max_iterations: usize,
    pub(crate) loss_threshold: f64,
    pub(crate) min_loss_delta: f64,
    pub(crate) warmup_iterations: usize,
    pub(crate) decay: LossIncreaseDecay,
    pub(crate) verbose: bool,
    pub(crate) log_every: usize,
    pub(crate) loss_fn: L,
    pub(crate) optimizer: O,
}

/// Fluent builder for constructing a `Trainer` with custom hyperparameters.
///
/// Defaults:
/// - `max_iterations`: 5000
/// - `loss_threshold`: 0.001
/// - `min_loss_delta`: 1e-6
/// - `warmup_iterations`: 10
/// - `decay_factor`: 0.8
/// - `verbose`: false
pub struct TrainerBuilder<L, O> {
    max_iterations: usize,
    loss_threshold: f64,
    min_loss_delta: f64,
    warmup_iterations: usize,
    decay: LossIncreaseDecay,
    verbose: bool,
    log_every: usize,
    loss_fn: L,
    optimizer: O,
}

impl<L, O> TrainerBuilder<L, O> {
    pub fn new(loss_fn: L, optimizer: O) -> Self {
        Self {
            max_iterations: 5000,
            loss_threshold: 0.001,
            min_loss_delta: 1e-6,
            warmup_iterations: 10,
            decay: LossIncreaseDecay::default(),
            verbose: false,
            log_every: 500,
            loss_fn,
            optimizer,
        }
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn loss_threshold(mut self, threshold: f64) -> Self {
        self.loss_threshold = threshold;
        self
    }

    pub fn min_loss_delta(mut self, delta: f64) -> Self {
        self.min_loss_delta = delta;
        self
    }

    pub fn warmup_iterations(mut self, iterations: usize) -> Self {
        self.warmup_iterations = iterations;
        self
    }

    pub fn decay_factor(mut self, factor: f64) -> Self {
        self.decay = LossIncreaseDecay::new(factor);
        self
    }

    /// When `true`, the loss is logged at `debug` level every `log_every` iterations.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn log_every(mut self, iterations: usize) -> Self {
        self.log_every = iterations.max(1);
        self
    }

    pub fn build(self) -> Trainer<L, O> {
        Trainer {
            max_iterations: self.max_iterations,
            loss_threshold: self.loss_threshold,
            min_loss_delta: self.min_loss_delta,
            warmup_iterations: self.warmup_iterations,
            decay: self.decay,
            verbose: self.verbose,
            log_every: self.log_every,
            loss_fn: self.loss_fn,
            optimizer: self.optimizer,
        }
    }
}

impl<L, O> Trainer<L, O> {
    pub fn builder(loss_fn: L, optimizer: O) -> TrainerBuilder<L, O> {
        TrainerBuilder::new(loss_fn, optimizer)
    }
}

/// The gradient-descent regressor trainer: MSE loss with plain SGD steps.
pub type GradientDescentTrainer = Trainer<MSELoss, SGD>;

impl GradientDescentTrainer {
    /// Builds a trainer from a validated [`TrainingConfig`].
    pub fn from_config(config: &TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Trainer::builder(MSELoss, SGD::new(config.learning_rate))
            .max_iterations(config.max_iterations)
            .loss_threshold(config.loss_threshold)
            .min_loss_delta(config.min_loss_delta)
            .warmup_iterations(config.warmup_iterations)
            .decay_factor(config.decay_factor)
            .verbose(config.verbose)
            .log_every(config.log_every)
            .build())
    }
}

impl Default for GradientDescentTrainer {
    fn default() -> Self {
        Trainer::builder(MSELoss, SGD::new(0.1)).build()
    }
}

impl<L, O> Trainer<L, O>
where
    L: Loss,
{
    /// Trains `model` on `dataset` and returns the fitted model.
    ///
    /// # Errors
    /// - [`EngineError::InvalidInput`] if the dataset is empty or its width
    ///   differs from the model's.
    /// - [`EngineError::NumericDivergence`] if the loss or any parameter
    ///   becomes NaN or infinite.
    pub fn fit<M, D>(&self, mut model: M, dataset: &D) -> Result<TrainingOutcome<M::Output>>
    where
        M: TrainableModel,
        O: Optimizer<M::Params> + Clone,
        D: Dataset,
    {
        let x = dataset.features();
        let y = dataset.labels();
        if dataset.is_empty() {
            return Err(EngineError::invalid("cannot train on an empty dataset"));
        }
        if x.nrows() != y.len() {
            return Err(EngineError::invalid(format!(
                "features have {} rows but labels have {}",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() != model.n_inputs() {
            return Err(EngineError::invalid(format!(
                "model expects {} features, dataset has {}",
                model.n_inputs(),
                x.ncols()
            )));
        }

        let mut optimizer = self.optimizer.clone();
        let mut losses: Vec<f64> = Vec::new();
        let mut reductions = 0;
        let mut stop_reason = StopReason::MaxIterations;

        info!(
            "training on {} samples x {} features (lr = {}, max_iterations = {})",
            x.nrows(),
            x.ncols(),
            optimizer.learning_rate(),
            self.max_iterations
        );

        for iteration in 0..self.max_iterations {
            let preds = model.forward(x);
            let loss = self.loss_fn.loss(preds.view(), y);
            if !loss.is_finite() {
                return Err(EngineError::NumericDivergence {
                    iteration,
                    detail: format!("loss is {}", loss),
                });
            }

            let grad_preds = self.loss_fn.grad_wrt_prediction(preds.view(), y);
            let grads = model.backward(x, grad_preds.view());
            let new_params = optimizer.step(model.params(), &grads);
            if !new_params.is_finite() {
                return Err(EngineError::NumericDivergence {
                    iteration,
                    detail: "parameters are no longer finite".to_string(),
                });
            }
            model.update_params(new_params);

            let previous = losses.last().copied();
            losses.push(loss);

            if let Some(prev) = previous {
                if let Some(lr) = self.decay.adjust(optimizer.learning_rate(), prev, loss) {
                    debug!(
                        "iteration {}: loss rose {:.6} -> {:.6}, learning rate {} -> {}",
                        iteration,
                        prev,
                        loss,
                        optimizer.learning_rate(),
                        lr
                    );
                    optimizer.set_learning_rate(lr);
                    reductions += 1;
                }
            }

            if self.verbose && iteration % self.log_every == 0 {
                debug!("iteration {}: loss = {:.6}", iteration, loss);
            }

            if loss < self.loss_threshold {
                stop_reason = StopReason::LossBelowThreshold;
                break;
            }
            if let Some(prev) = previous {
                if iteration > self.warmup_iterations && (loss - prev).abs() < self.min_loss_delta {
                    stop_reason = StopReason::LossPlateau;
                    break;
                }
            }
        }

        let history = TrainingHistory {
            losses,
            learning_rate_reductions: reductions,
            final_learning_rate: optimizer.learning_rate(),
            stop_reason,
        };
        info!(
            "training stopped after {} iterations ({:?}), final loss = {:?}",
            history.iterations(),
            history.stop_reason,
            history.final_loss()
        );

        Ok(TrainingOutcome {
            model: model.into_fitted(),
            history,
        })
    }
}
