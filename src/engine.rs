//! End-to-end training: raw rows in, immutable [`TrainedModel`] out.
//!
//! The pipeline is
//! 1. extract numeric examples for the selected features and target,
//! 2. split chronologically into train and test,
//! 3. fit standardization on the training split only,
//! 4. run gradient descent on the standardized training split,
//! 5. evaluate on the test split (R² against the training labels),
//! 6. rank features by coefficient magnitude.

use crate::config::TrainingConfig;
use crate::dataset::{Dataset, DatasetRow, InMemoryDataset};
use crate::error::{EngineError, Result};
use crate::importance::{self, FeatureImportance};
use crate::metrics::{self, EvaluationMetrics};
use crate::model::{Fitted, InferenceModel, LinearModel, LinearParams, LinearRegression};
use crate::preprocessing::{FeatureStandardizer, FittedTransformer, StandardizationParams, Transformer};
use crate::store::ModelId;
use crate::trainer::{GradientDescentTrainer, StopReason};
use chrono::{DateTime, Utc};
use log::{info, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

/// Which split the stored evaluation was computed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSplit {
    Test,
    /// The test split was empty (`test_ratio` too small for the row count).
    Train,
}

/// How a model was trained.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub train_samples: usize,
    pub test_samples: usize,
    /// Rows dropped for missing or non-numeric values.
    pub discarded_rows: usize,
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub learning_rate_reductions: usize,
    pub final_learning_rate: f64,
    pub final_loss: f64,
    pub evaluated_on: EvaluationSplit,
    pub duration_ms: u64,
}

/// A trained linear regressor with everything needed to use it.
///
/// Coefficients apply to **standardized** features; `standardization` holds
/// the training-split statistics used to get there. A model is never
/// modified after creation.
#[derive(Clone, Debug, Serialize)]
pub struct TrainedModel {
    pub id: ModelId,
    /// One per feature, in `feature_names` order.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub standardization: StandardizationParams,
    /// Rounded to 4 decimal places.
    pub evaluation: EvaluationMetrics,
    pub feature_importance: Vec<FeatureImportance>,
    pub training: TrainingSummary,
    pub created_at: DateTime<Utc>,
}

impl TrainedModel {
    /// Inference view of the coefficients.
    pub fn predictor(&self) -> LinearModel<Fitted> {
        LinearModel::<Fitted>::new(LinearParams {
            weights: Array1::from(self.coefficients.clone()),
            bias: self.intercept,
        })
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Predicts from an already standardized feature vector.
    pub fn predict_standardized(&self, features: &[f64]) -> Result<f64> {
        self.predictor().predict_one(features)
    }

    /// Standardizes a raw feature vector with the model's parameters and predicts.
    pub fn predict_raw(&self, features: &[f64]) -> Result<f64> {
        let scaled = self.standardization.transform_row(features)?;
        self.predict_standardized(&scaled)
    }

    /// Predicts one value per raw dataset row.
    ///
    /// # Errors
    /// [`EngineError::InvalidInput`] if a row lacks a feature or holds a
    /// non-numeric value for one.
    pub fn predict_rows(&self, rows: &[DatasetRow]) -> Result<Vec<f64>> {
        let mut data = Vec::with_capacity(rows.len() * self.n_features());
        for (i, row) in rows.iter().enumerate() {
            let values = row.numbers(&self.feature_names).ok_or_else(|| {
                EngineError::invalid(format!(
                    "row {} has no numeric value for one of {:?}",
                    i, self.feature_names
                ))
            })?;
            data.extend(values);
        }
        let x = Array2::from_shape_vec((rows.len(), self.n_features()), data)
            .map_err(|e| EngineError::invalid(e.to_string()))?;
        let scaled = self.standardization.transform(x.view())?;
        Ok(self.predictor().predict_batch(scaled.view())?.to_vec())
    }
}

/// One training job: which columns to use and how to train.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainRequest {
    pub selected_features: Vec<String>,
    pub target_column: String,
    /// Share of rows (taken from the end) held out for evaluation.
    pub test_ratio: f64,
    pub config: TrainingConfig,
}

impl TrainRequest {
    pub fn new(selected_features: Vec<String>, target_column: impl Into<String>) -> Self {
        Self {
            selected_features,
            target_column: target_column.into(),
            test_ratio: 0.2,
            config: TrainingConfig::default(),
        }
    }

    pub fn with_test_ratio(mut self, test_ratio: f64) -> Self {
        self.test_ratio = test_ratio;
        self
    }

    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// Trains on `rows`; see [`train_model`].
    pub fn train(&self, rows: &[DatasetRow]) -> Result<TrainedModel> {
        train_model(
            rows,
            &self.selected_features,
            &self.target_column,
            self.test_ratio,
            &self.config,
        )
    }
}

/// Trains a model on `rows`.
///
/// The last `test_ratio` share of usable rows (in input order) is held out
/// for evaluation. If that share rounds down to nothing, the evaluation is
/// computed on the training split instead.
///
/// # Errors
/// - [`EngineError::InvalidInput`] for unknown columns, no usable rows or a
///   `test_ratio` outside `[0, 1)`.
/// - [`EngineError::Config`] for invalid hyperparameters.
/// - [`EngineError::NumericDivergence`] if training blows up.
pub fn train_model(
    rows: &[DatasetRow],
    selected_features: &[String],
    target_column: &str,
    test_ratio: f64,
    config: &TrainingConfig,
) -> Result<TrainedModel> {
    let started = Instant::now();
    let trainer = GradientDescentTrainer::from_config(config)?;

    let dataset = InMemoryDataset::from_rows(rows, selected_features, target_column)?;
    let discarded_rows = rows.len() - dataset.n_samples();
    let (train, test) = dataset.split(test_ratio)?;

    let (standardization, train_x) = FeatureStandardizer::new().fit_transform(train.features())?;
    let train_scaled = train.with_features(train_x)?;

    let outcome = trainer.fit(LinearRegression::new(selected_features.len()), &train_scaled)?;
    let fitted = outcome.model;
    let history = outcome.history;

    let (eval_set, evaluated_on) = if test.is_empty() {
        warn!("test split is empty; evaluating '{}' on the training split", target_column);
        (&train, EvaluationSplit::Train)
    } else {
        (&test, EvaluationSplit::Test)
    };
    let eval_x = standardization.transform(eval_set.features())?;
    let predictions = fitted.predict_batch(eval_x.view())?;
    let evaluation =
        metrics::evaluate(eval_set.labels(), predictions.view(), train.labels())?.rounded();
    if !evaluation.r2.is_finite() {
        warn!("r2 is undefined: training labels of '{}' are constant", target_column);
    }

    let coefficients = fitted.coefficients().to_vec();
    let feature_importance = importance::rank(selected_features, &coefficients)?;

    let training = TrainingSummary {
        train_samples: train.n_samples(),
        test_samples: test.n_samples(),
        discarded_rows,
        iterations: history.iterations(),
        stop_reason: history.stop_reason,
        learning_rate_reductions: history.learning_rate_reductions,
        final_learning_rate: history.final_learning_rate,
        final_loss: history.final_loss().unwrap_or(f64::NAN),
        evaluated_on,
        duration_ms: started.elapsed().as_millis() as u64,
    };

    let model = TrainedModel {
        id: ModelId::new(),
        coefficients,
        intercept: fitted.intercept(),
        feature_names: selected_features.to_vec(),
        target_column: target_column.to_string(),
        standardization,
        evaluation,
        feature_importance,
        training,
        created_at: Utc::now(),
    };
    info!(
        "trained model {} for '{}' on {:?}: mse={} rmse={} mae={} r2={}",
        model.id,
        model.target_column,
        model.feature_names,
        evaluation.mse,
        evaluation.rmse,
        evaluation.mae,
        evaluation.r2
    );
    Ok(model)
}

/// Trains every request over the same rows in parallel.
///
/// Results come back in request order; one failing request does not affect
/// the others.
pub fn train_many(rows: &[DatasetRow], requests: &[TrainRequest]) -> Vec<Result<TrainedModel>> {
    requests.par_iter().map(|request| request.train(rows)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    fn linear_rows(n: usize) -> Vec<DatasetRow> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                [("x", x), ("y", 2.0 * x)].into_iter().collect()
            })
            .collect()
    }

    #[test]
    fn test_train_model_y_equals_two_x() {
        let rows: Vec<DatasetRow> = (1..=4)
            .map(|i| [("x", i as f64), ("y", 2.0 * i as f64)].into_iter().collect())
            .collect();
        let model = train_model(&rows, &names(&["x"]), "y", 0.0, &TrainingConfig::default()).unwrap();

        assert!((model.coefficients[0] - 2.0 * 1.25f64.sqrt()).abs() < 0.05);
        assert!((model.intercept - 5.0).abs() < 0.05);
        assert!(model.evaluation.mse < 0.001);
        assert!(model.evaluation.r2 > 0.99);
        assert_eq!(model.training.evaluated_on, EvaluationSplit::Train);
        assert_eq!(model.training.stop_reason, StopReason::LossBelowThreshold);
    }

    #[test]
    fn test_train_model_holds_out_tail() {
        let model = train_model(&linear_rows(10), &names(&["x"]), "y", 0.2, &TrainingConfig::default())
            .unwrap();
        assert_eq!(model.training.train_samples, 8);
        assert_eq!(model.training.test_samples, 2);
        assert_eq!(model.training.evaluated_on, EvaluationSplit::Test);
        // standardization comes from rows 0..8 only
        assert!((model.standardization.features[0].mean - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_train_model_shapes_are_consistent() {
        let rows: Vec<DatasetRow> = (0..30)
            .map(|i| {
                let (a, b) = (i as f64, (i % 4) as f64);
                [("a", a), ("b", b), ("y", a - 2.0 * b)].into_iter().collect()
            })
            .collect();
        let model = train_model(&rows, &names(&["b", "a"]), "y", 0.2, &TrainingConfig::default())
            .unwrap();
        assert_eq!(model.coefficients.len(), 2);
        assert_eq!(model.standardization.len(), 2);
        assert_eq!(model.feature_names, names(&["b", "a"]));
        let total: f64 = model.feature_importance.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_train_model_discards_text_rows() {
        let mut rows = linear_rows(10);
        rows[3].set("x", "n/a");
        rows[5].set("y", Value::Text("".into()));
        let model = train_model(&rows, &names(&["x"]), "y", 0.0, &TrainingConfig::default()).unwrap();
        assert_eq!(model.training.discarded_rows, 2);
        assert_eq!(model.training.train_samples, 8);
    }

    #[test]
    fn test_train_model_unknown_column() {
        let err = train_model(&linear_rows(5), &names(&["z"]), "y", 0.2, &TrainingConfig::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_train_model_bad_config() {
        let config = TrainingConfig {
            learning_rate: 0.0,
            ..TrainingConfig::default()
        };
        let err = train_model(&linear_rows(5), &names(&["x"]), "y", 0.2, &config).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_train_model_constant_target_keeps_r2_sentinel() {
        let rows: Vec<DatasetRow> = (0..10)
            .map(|i| [("x", i as f64), ("y", 4.0)].into_iter().collect())
            .collect();
        let model = train_model(&rows, &names(&["x"]), "y", 0.2, &TrainingConfig::default()).unwrap();
        assert!(!model.evaluation.r2.is_finite());
        assert!(matches!(
            model.evaluation.checked_r2(),
            Err(EngineError::UndefinedMetric(_))
        ));
    }

    #[test]
    fn test_predict_rows_standardizes_raw_input() {
        let model = train_model(&linear_rows(20), &names(&["x"]), "y", 0.0, &TrainingConfig::default())
            .unwrap();
        let query: Vec<DatasetRow> = [5.0, 10.0]
            .iter()
            .map(|&x| [("x", x)].into_iter().collect())
            .collect();
        let preds = model.predict_rows(&query).unwrap();
        assert!((preds[0] - 10.0).abs() < 0.2);
        assert!((preds[1] - 20.0).abs() < 0.2);
        assert!((model.predict_raw(&[5.0]).unwrap() - preds[0]).abs() < 1e-12);

        let bad: Vec<DatasetRow> = vec![[("x", "text")].into_iter().collect()];
        assert!(matches!(model.predict_rows(&bad), Err(EngineError::InvalidInput(_))));
        assert!(model.predict_rows(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_train_many_keeps_order_and_isolates_failures() {
        let rows = linear_rows(12);
        let requests = vec![
            TrainRequest::new(names(&["x"]), "y"),
            TrainRequest::new(names(&["nope"]), "y"),
            TrainRequest::new(names(&["y"]), "x"),
        ];
        let results = train_many(&rows, &requests);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().target_column, "y");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().target_column, "x");
    }

    #[test]
    fn test_request_holds_out_its_test_ratio() {
        let rows = linear_rows(10);
        let model = TrainRequest::new(names(&["x"]), "y").train(&rows).unwrap();
        assert_eq!(model.training.test_samples, 2);

        let model = TrainRequest::new(names(&["x"]), "y")
            .with_test_ratio(0.5)
            .train(&rows)
            .unwrap();
        assert_eq!(model.training.train_samples, 5);
        assert_eq!(model.training.test_samples, 5);

        let err = TrainRequest::new(names(&["x"]), "y")
            .with_test_ratio(1.0)
            .train(&rows)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_model_serializes_to_json() {
        let model = train_model(&linear_rows(10), &names(&["x"]), "y", 0.2, &TrainingConfig::default())
            .unwrap();
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["target_column"], "y");
        assert_eq!(json["feature_names"][0], "x");
        assert_eq!(json["training"]["evaluated_on"], "test");
        assert!(json["id"].is_string());
        assert!(json["evaluation"]["rmse"].is_number());
    }
}
