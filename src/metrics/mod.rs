//! Regression evaluation metrics.
//!
//! The R² baseline (total sum of squares) is taken from the labels the model
//! was **trained** on, not from the split being evaluated. With a constant
//! training target that baseline is zero and R² is left as the resulting
//! `NaN`/`±inf` sentinel; use [`EvaluationMetrics::checked_r2`] to turn it
//! into an error.

use crate::error::{EngineError, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Metrics of one evaluation run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl EvaluationMetrics {
    /// Copy with every metric rounded to 4 decimal places for reporting.
    ///
    /// Non-finite values are kept as they are.
    pub fn rounded(&self) -> Self {
        Self {
            mse: round4(self.mse),
            rmse: round4(self.rmse),
            mae: round4(self.mae),
            r2: round4(self.r2),
        }
    }

    /// R², or [`EngineError::UndefinedMetric`] if it is `NaN` or infinite.
    pub fn checked_r2(&self) -> Result<f64> {
        if self.r2.is_finite() {
            Ok(self.r2)
        } else {
            Err(EngineError::UndefinedMetric(format!(
                "r2 is {} because the training labels have zero variance",
                self.r2
            )))
        }
    }
}

fn round4(x: f64) -> f64 {
    if x.is_finite() {
        (x * 10_000.0).round() / 10_000.0
    } else {
        x
    }
}

fn check_pair(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(EngineError::invalid(format!(
            "{} true values but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(EngineError::invalid("cannot evaluate on zero samples"));
    }
    Ok(())
}

/// Mean Squared Error: `mean((y_true - y_pred)^2)`.
pub fn mse(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let diff = &y_true - &y_pred;
    Ok(diff.dot(&diff) / diff.len() as f64)
}

/// Mean Absolute Error: `mean(|y_true - y_pred|)`.
pub fn mae(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let diff = &y_true - &y_pred;
    Ok(diff.mapv(f64::abs).sum() / diff.len() as f64)
}

/// R² against the training-label baseline:
///
/// ```text
/// r2 = 1 - Σ(y_true - y_pred)² / Σ(y_train - mean(y_train))²
/// ```
///
/// A zero baseline yields `NaN` (perfect fit) or `-inf`.
pub fn r2(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
    training_labels: ArrayView1<'_, f64>,
) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let mean = training_labels
        .mean()
        .ok_or_else(|| EngineError::invalid("training labels are empty"))?;
    let ss_tot = training_labels.mapv(|t| (t - mean).powi(2)).sum();
    let diff = &y_true - &y_pred;
    let ss_res = diff.dot(&diff);
    Ok(1.0 - ss_res / ss_tot)
}

/// Computes every [`EvaluationMetrics`] field (unrounded).
///
/// # Errors
/// [`EngineError::InvalidInput`] on a length mismatch or empty inputs.
pub fn evaluate(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
    training_labels: ArrayView1<'_, f64>,
) -> Result<EvaluationMetrics> {
    let mse = mse(y_true, y_pred)?;
    Ok(EvaluationMetrics {
        mse,
        rmse: mse.sqrt(),
        mae: mae(y_true, y_pred)?,
        r2: r2(y_true, y_pred, training_labels)?,
    })
}

/// Mean Absolute Percentage Error, in percent.
///
/// Samples with `|y_true| <= 1e-4` are skipped; if every sample is skipped
/// the metric is undefined.
pub fn mape(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let (sum, count) = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, _)| t.abs() > 1e-4)
        .fold((0.0, 0usize), |(sum, count), (t, p)| {
            (sum + ((t - p) / t).abs(), count + 1)
        });
    if count == 0 {
        return Err(EngineError::UndefinedMetric(
            "mape needs at least one non-zero true value".to_string(),
        ));
    }
    Ok(sum / count as f64 * 100.0)
}

/// Mean Absolute Scaled Error: MAE divided by the MAE of the naive
/// one-step forecast (`y[t-1]` predicting `y[t]`) over the same series.
pub fn mase(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<f64> {
    let mae = mae(y_true, y_pred)?;
    if y_true.len() < 2 {
        return Err(EngineError::UndefinedMetric(
            "mase needs at least two samples".to_string(),
        ));
    }
    let naive = y_true
        .windows(2)
        .into_iter()
        .map(|w| (w[1] - w[0]).abs())
        .sum::<f64>()
        / (y_true.len() - 1) as f64;
    if naive == 0.0 {
        return Err(EngineError::UndefinedMetric(
            "mase is undefined for a constant series".to_string(),
        ));
    }
    Ok(mae / naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse_and_mae() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![2.0, 3.0, 4.0, 5.0];
        assert!((mse(y_true.view(), y_pred.view()).unwrap() - 1.0).abs() < 1e-12);
        assert!((mae(y_true.view(), y_pred.view()).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_perfect_prediction() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        let m = evaluate(y.view(), y.view(), y.view()).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn test_rmse_is_sqrt_mse() {
        let y_true = array![0.0, 0.0];
        let y_pred = array![3.0, -1.0];
        let m = evaluate(y_true.view(), y_pred.view(), array![0.0, 1.0].view()).unwrap();
        assert!((m.mse - 5.0).abs() < 1e-12);
        assert!((m.rmse - 5f64.sqrt()).abs() < 1e-12);
        assert!((m.mae - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_r2_uses_training_baseline() {
        let y_true = array![10.0, 12.0];
        let y_pred = array![11.0, 11.0];

        // Same predictions, two baselines with different spread.
        let narrow = array![10.0, 12.0];
        let wide = array![0.0, 20.0, 40.0];
        let r_narrow = r2(y_true.view(), y_pred.view(), narrow.view()).unwrap();
        let r_wide = r2(y_true.view(), y_pred.view(), wide.view()).unwrap();

        // ss_res = 2; ss_tot(narrow) = 2; ss_tot(wide) = 800
        assert!((r_narrow - 0.0).abs() < 1e-12);
        assert!((r_wide - (1.0 - 2.0 / 800.0)).abs() < 1e-12);
        assert_ne!(r_narrow, r_wide);
    }

    #[test]
    fn test_r2_baseline_mean_not_recomputed_from_true_values() {
        let y_true = array![5.0, 5.0];
        let y_pred = array![5.0, 6.0];
        let a = r2(y_true.view(), y_pred.view(), array![0.0, 2.0].view()).unwrap();
        let b = r2(y_true.view(), y_pred.view(), array![100.0, 102.0].view()).unwrap();
        // Both baselines have ss_tot = 2, only their means differ.
        assert!((a - 0.5).abs() < 1e-12);
        assert!((b - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_r2_zero_variance_is_sentinel() {
        let constant = array![3.0, 3.0, 3.0];

        let exact = evaluate(constant.view(), constant.view(), constant.view()).unwrap();
        assert!(exact.r2.is_nan());

        let off = array![3.0, 4.0, 3.0];
        let m = evaluate(constant.view(), off.view(), constant.view()).unwrap();
        assert!(m.r2.is_infinite() && m.r2 < 0.0);

        let err = m.checked_r2().unwrap_err();
        assert!(matches!(err, EngineError::UndefinedMetric(_)));
        assert!(exact.checked_r2().is_err());
    }

    #[test]
    fn test_rounded_keeps_sentinels() {
        let m = EvaluationMetrics {
            mse: 0.123456,
            rmse: 0.351363,
            mae: 1.00006,
            r2: f64::NAN,
        };
        let r = m.rounded();
        assert_eq!(r.mse, 0.1235);
        assert_eq!(r.rmse, 0.3514);
        assert_eq!(r.mae, 1.0001);
        assert!(r.r2.is_nan());
    }

    #[test]
    fn test_evaluate_rejects_bad_shapes() {
        let a = array![1.0, 2.0];
        let b = array![1.0];
        let empty = ndarray::Array1::<f64>::zeros(0);
        assert!(matches!(
            evaluate(a.view(), b.view(), a.view()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            evaluate(empty.view(), empty.view(), a.view()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            evaluate(a.view(), a.view(), empty.view()),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_mape_skips_near_zero_truth() {
        let y_true = array![0.0, 100.0, 200.0];
        let y_pred = array![5.0, 110.0, 180.0];
        // (10% + 10%) / 2
        assert!((mape(y_true.view(), y_pred.view()).unwrap() - 10.0).abs() < 1e-9);

        let zeros = array![0.0, 0.0];
        assert!(matches!(
            mape(zeros.view(), zeros.view()),
            Err(EngineError::UndefinedMetric(_))
        ));
    }

    #[test]
    fn test_mase() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![1.5, 2.5, 3.5, 4.5];
        // mae = 0.5, naive mae = 1.0
        assert!((mase(y_true.view(), y_pred.view()).unwrap() - 0.5).abs() < 1e-12);

        let flat = array![2.0, 2.0, 2.0];
        assert!(mase(flat.view(), flat.view()).is_err());
    }
}
