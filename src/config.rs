//! Training and forecasting configuration.
//!
//! Both configs deserialize from JSON with every field optional, so a
//! caller only spells out what it overrides:
//!
//! ```rust
//! use regress_forecast::config::TrainingConfig;
//!
//! let config = TrainingConfig::from_json_str(r#"{ "learning_rate": 0.05 }"#).unwrap();
//! assert_eq!(config.learning_rate, 0.05);
//! assert_eq!(config.max_iterations, 5000);
//! ```

use crate::error::{EngineError, Result};
use crate::forecast::ConfidenceBand;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hyperparameters of a training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Initial gradient-descent step size.
    pub learning_rate: f64,
    pub max_iterations: usize,
    /// Stop once the mean squared loss drops below this.
    pub loss_threshold: f64,
    /// Stop once consecutive losses differ by less than this (after warm-up).
    pub min_loss_delta: f64,
    /// Iterations before the loss-delta rule may fire.
    pub warmup_iterations: usize,
    /// Learning-rate multiplier applied whenever the loss increases.
    pub decay_factor: f64,
    pub verbose: bool,
    /// Loss is logged every `log_every` iterations when `verbose`.
    pub log_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iterations: 5000,
            loss_threshold: 0.001,
            min_loss_delta: 1e-6,
            warmup_iterations: 10,
            decay_factor: 0.8,
            verbose: false,
            log_every: 500,
        }
    }
}

impl TrainingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(EngineError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(EngineError::Config(format!(
                "decay_factor must be in (0, 1], got {}",
                self.decay_factor
            )));
        }
        if self.loss_threshold < 0.0 || self.min_loss_delta < 0.0 {
            return Err(EngineError::Config(
                "stopping thresholds must not be negative".to_string(),
            ));
        }
        if self.log_every == 0 {
            return Err(EngineError::Config("log_every must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Settings of a forecast run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Rows averaged into the baseline feature vector.
    pub window: usize,
    /// Sliding-window length of the autoregressive rollout.
    pub lookback: usize,
    pub band: ConfidenceBand,
    /// Floor predictions and lower bounds at zero.
    pub non_negative: bool,
    /// Column holding `YYYYMM` period labels, if any.
    pub date_column: Option<String>,
    /// Column the autoregressive rollout writes each prediction into.
    /// Defaults to the model's target column; set it to a lag feature when
    /// the target itself is not a model input.
    pub feedback_column: Option<String>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window: 10,
            lookback: 6,
            band: ConfidenceBand::default(),
            non_negative: true,
            date_column: None,
            feedback_column: None,
        }
    }
}

impl ForecastConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_band(mut self, band: ConfidenceBand) -> Self {
        self.band = band;
        self
    }

    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = Some(column.into());
        self
    }

    pub fn with_feedback_column(mut self, column: impl Into<String>) -> Self {
        self.feedback_column = Some(column.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 || self.lookback == 0 {
            return Err(EngineError::Config(
                "window and lookback must be at least 1".to_string(),
            ));
        }
        self.band.validate()
    }
}
