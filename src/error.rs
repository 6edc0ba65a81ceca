//! Error types for training, evaluation and forecasting.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error type for every fallible engine operation.
///
/// Errors are raised by the call that detects them and are never retried
/// inside the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Empty or malformed training data, unknown column names, shape mismatches.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// NaN or infinity produced while optimizing.
    #[error("Numeric divergence at iteration {iteration}: {detail}")]
    NumericDivergence { iteration: usize, detail: String },

    /// Not enough historical rows to fill the forecast window.
    #[error("Insufficient history: need at least {required} rows, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// A metric that is mathematically undefined for the given data.
    #[error("Undefined metric: {0}")]
    UndefinedMetric(String),

    /// No model registered under the requested id.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Invalid hyperparameter or configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_input() {
        let err = EngineError::invalid("no rows");
        assert_eq!(err.to_string(), "Invalid input: no rows");
    }

    #[test]
    fn test_error_display_numeric_divergence() {
        let err = EngineError::NumericDivergence {
            iteration: 42,
            detail: "loss is NaN".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("iteration 42"));
        assert!(msg.contains("loss is NaN"));
    }

    #[test]
    fn test_error_display_insufficient_history() {
        let err = EngineError::InsufficientHistory {
            required: 10,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient history: need at least 10 rows, got 3"
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io_err.into();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_err = serde_json::from_str::<f64>("not json").unwrap_err();
        let err: EngineError = json_err.into();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn test_error_is_std_error() {
        let err = EngineError::UndefinedMetric("r2".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
