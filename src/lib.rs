//! # regress-forecast
//!
//! A regression training, evaluation and forecasting engine for tabular
//! time-series data.
//!
//! ## Core Design Principles
//!
//! - **Stateful Type Safety**: models carry their training state in the type
//!   system (`Unfitted` vs `Fitted`); only fitted models can predict.
//! - **Training/Inference Separation**: losses, optimizers and the trainer
//!   live apart from the model; a [`TrainedModel`] only holds what prediction
//!   needs.
//! - **No leakage**: standardization is fit on the training split only, and
//!   R² is measured against the training-label baseline.
//! - **Immutability**: trained models are never modified; retraining yields a
//!   new model with a new id.
//!
//! ## Quick Start
//!
//! ```rust
//! use regress_forecast::{train_model, DatasetRow, ForecastEngine, TrainingConfig};
//!
//! let rows: Vec<DatasetRow> = (0..24)
//!     .map(|i| [("t", i as f64), ("y", 3.0 * i as f64 + 2.0)].into_iter().collect())
//!     .collect();
//!
//! let model = train_model(&rows, &["t".to_string()], "y", 0.2, &TrainingConfig::default()).unwrap();
//! assert!(model.evaluation.r2 > 0.99);
//!
//! let report = ForecastEngine::default().forecast(&model, &rows, 3).unwrap();
//! assert_eq!(report.points.len(), 3);
//! ```
//!
//! ## Module Structure
//!
//! - `dataset` — typed rows and dense numeric datasets
//! - `preprocessing` — feature standardization
//! - `model` — linear model with stateful type parameters
//! - `loss` / `optimizer` / `trainer` — gradient-descent training loop
//! - `metrics` — evaluation metrics
//! - `importance` — feature-importance ranking
//! - `engine` — end-to-end training and [`TrainedModel`]
//! - `forecast` — multi-period forecasts with confidence bands
//! - `store` — model registry
//! - `config` — JSON-loadable training and forecast settings

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod importance;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod optimizer;
pub mod preprocessing;
pub mod store;
pub mod trainer;

pub use config::{ForecastConfig, TrainingConfig};
pub use dataset::{DatasetRow, Value};
pub use engine::{train_many, train_model, TrainRequest, TrainedModel};
pub use error::{EngineError, Result};
pub use forecast::{
    ConfidenceBand, ForecastEngine, ForecastMethod, ForecastPoint, ForecastReport, GroupKey,
};
pub use metrics::EvaluationMetrics;
pub use store::{InMemoryModelStore, ModelId, ModelStore};
