//! Multi-period forecasting on top of a [`TrainedModel`].
//!
//! Two rollouts are available:
//!
//! - [`ForecastEngine::forecast`] averages each feature over the last
//!   `window` rows and predicts once; every requested period gets that value.
//! - [`ForecastEngine::forecast_autoregressive`] slides a `lookback` window
//!   forward, predicting from the newest row and writing each prediction
//!   into the feedback column of a synthetic next row, so later periods see
//!   earlier predictions.
//!
//! Both attach a [`ConfidenceBand`] to every point.

use crate::config::ForecastConfig;
use crate::dataset::{DatasetRow, Value};
use crate::engine::TrainedModel;
use crate::error::{EngineError, Result};
use crate::store::ModelId;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// How the interval around each prediction is sized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// `margin = |prediction| * fraction`.
    FixedPercent { fraction: f64 },
    /// `margin = z * σ`, with σ the population standard deviation of the
    /// historical target values.
    HistoricalStdDev { z: f64 },
}

impl Default for ConfidenceBand {
    fn default() -> Self {
        ConfidenceBand::FixedPercent { fraction: 0.1 }
    }
}

impl ConfidenceBand {
    /// The 95% band around the historical spread.
    pub fn historical_95() -> Self {
        ConfidenceBand::HistoricalStdDev { z: 1.96 }
    }

    pub fn validate(&self) -> Result<()> {
        let (name, value) = match *self {
            ConfidenceBand::FixedPercent { fraction } => ("fraction", fraction),
            ConfidenceBand::HistoricalStdDev { z } => ("z", z),
        };
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(EngineError::Config(format!(
                "confidence band {} must be a non-negative number, got {}",
                name, value
            )))
        }
    }

    /// Half-width of the interval around `prediction`.
    pub fn margin(&self, prediction: f64, historical_std: Option<f64>) -> Result<f64> {
        match *self {
            ConfidenceBand::FixedPercent { fraction } => Ok(prediction.abs() * fraction),
            ConfidenceBand::HistoricalStdDev { z } => historical_std.map(|s| z * s).ok_or_else(|| {
                EngineError::invalid("history has no numeric target values to size the band")
            }),
        }
    }
}

/// Which rollout produced a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    MeanWindow,
    Autoregressive,
}

/// One forecast period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 1-based offset from the newest historical row.
    pub period: u32,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// `YYYYMM` label when the history carries a date column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_month: Option<u32>,
}

/// Result of one forecast run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastReport {
    pub model_id: ModelId,
    pub target_column: String,
    pub method: ForecastMethod,
    pub band: ConfidenceBand,
    /// Population standard deviation of the historical target values.
    pub historical_std_dev: Option<f64>,
    pub history_rows: usize,
    pub points: Vec<ForecastPoint>,
}

impl ForecastReport {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// The month after a `YYYYMM` label; December rolls into January.
///
/// ```rust
/// use regress_forecast::forecast::next_year_month;
///
/// assert_eq!(next_year_month(202311).unwrap(), 202312);
/// assert_eq!(next_year_month(202312).unwrap(), 202401);
/// ```
pub fn next_year_month(year_month: u32) -> Result<u32> {
    let (year, month) = (year_month / 100, year_month % 100);
    if !(1..=12).contains(&month) {
        return Err(EngineError::invalid(format!(
            "'{}' is not a YYYYMM label",
            year_month
        )));
    }
    if month < 12 {
        return Ok(year_month + 1);
    }
    year.checked_add(1)
        .and_then(|y| y.checked_mul(100))
        .and_then(|ym| ym.checked_add(1))
        .ok_or_else(|| {
            EngineError::invalid(format!("the month after '{}' is out of range", year_month))
        })
}

/// Group of rows in [`ForecastEngine::forecast_by_group`].
///
/// Numbers and text never share a group: `1` and `"1"` are distinct keys.
/// Numeric keys sort before text keys.
#[derive(Clone, Debug)]
pub enum GroupKey {
    Number(f64),
    Text(String),
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            (GroupKey::Number(_), GroupKey::Text(_)) => Ordering::Less,
            (GroupKey::Text(_), GroupKey::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(n) => write!(f, "{}", n),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

impl From<&Value> for GroupKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(n) => GroupKey::Number(*n),
            Value::Text(s) => GroupKey::Text(s.clone()),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        GroupKey::Text(s.to_string())
    }
}

impl From<f64> for GroupKey {
    fn from(n: f64) -> Self {
        GroupKey::Number(n)
    }
}

/// Produces forecasts for trained models.
#[derive(Clone, Debug, Default)]
pub struct ForecastEngine {
    config: ForecastConfig,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Mean-of-recent-window forecast for `periods` independent periods.
    ///
    /// # Errors
    /// - [`EngineError::InsufficientHistory`] with fewer than `window` rows.
    /// - [`EngineError::InvalidInput`] if a feature has no numeric value in
    ///   the window, or the date column holds no `YYYYMM` label.
    pub fn forecast(
        &self,
        model: &TrainedModel,
        history: &[DatasetRow],
        periods: usize,
    ) -> Result<ForecastReport> {
        let history = self.prepare_history(history, self.config.window)?;
        let window = &history[history.len() - self.config.window..];
        let historical_std = target_std(&history, &model.target_column);

        let baseline = window_means(window.iter(), &model.feature_names)?;
        let value = self.floor(model.predict_raw(&baseline)?);

        let mut year_month = self.newest_year_month(&history)?;
        let mut points = Vec::with_capacity(periods);
        for period in 1..=periods {
            year_month = year_month.map(next_year_month).transpose()?;
            points.push(self.point(period, value, historical_std, year_month)?);
        }

        info!(
            "mean-window forecast of '{}' with model {}: {} periods from {} rows",
            model.target_column,
            model.id,
            periods,
            history.len()
        );
        Ok(self.report(model, ForecastMethod::MeanWindow, historical_std, history.len(), points))
    }

    /// Autoregressive rollout over a sliding `lookback` window.
    ///
    /// Each step predicts from the newest numeric value of every feature in
    /// the window, then appends a row copied from the newest one with the
    /// (floored) prediction written into the feedback column, and drops the
    /// oldest row. The feedback column is `feedback_column` if configured,
    /// else the target column.
    ///
    /// # Errors
    /// As [`forecast`](Self::forecast), with `lookback` as the required
    /// history length.
    pub fn forecast_autoregressive(
        &self,
        model: &TrainedModel,
        history: &[DatasetRow],
        periods: usize,
    ) -> Result<ForecastReport> {
        let lookback = self.config.lookback;
        let history = self.prepare_history(history, lookback)?;
        let historical_std = target_std(&history, &model.target_column);
        let mut window: VecDeque<DatasetRow> =
            history[history.len() - lookback..].iter().cloned().collect();

        let feedback = self
            .config
            .feedback_column
            .as_deref()
            .unwrap_or(model.target_column.as_str());

        let mut year_month = self.newest_year_month(&history)?;
        let mut points = Vec::with_capacity(periods);
        for period in 1..=periods {
            let inputs = latest_values(window.iter(), &model.feature_names)?;
            let value = self.floor(model.predict_raw(&inputs)?);
            year_month = year_month.map(next_year_month).transpose()?;

            let mut next = window.back().cloned().unwrap_or_default();
            next.set(feedback, value);
            if let (Some(column), Some(ym)) = (&self.config.date_column, year_month) {
                next.set(column.as_str(), Value::Number(f64::from(ym)));
            }
            window.push_back(next);
            window.pop_front();

            points.push(self.point(period, value, historical_std, year_month)?);
        }

        info!(
            "autoregressive forecast of '{}' with model {}: {} periods, lookback {}",
            model.target_column, model.id, periods, lookback
        );
        Ok(self.report(model, ForecastMethod::Autoregressive, historical_std, history.len(), points))
    }

    /// Forecasts each group of `history` (rows sharing a `group_column`
    /// value) independently and in parallel.
    ///
    /// Rows without a group value are skipped. A group that fails, e.g.
    /// with too little history, reports its own error.
    pub fn forecast_by_group(
        &self,
        model: &TrainedModel,
        history: &[DatasetRow],
        group_column: &str,
        periods: usize,
        method: ForecastMethod,
    ) -> BTreeMap<GroupKey, Result<ForecastReport>> {
        let mut groups: BTreeMap<GroupKey, Vec<DatasetRow>> = BTreeMap::new();
        let mut ungrouped = 0;
        for row in history {
            match row.get(group_column) {
                Some(key) => groups.entry(GroupKey::from(key)).or_default().push(row.clone()),
                None => ungrouped += 1,
            }
        }
        if ungrouped > 0 {
            warn!("{} rows have no '{}' value and were skipped", ungrouped, group_column);
        }

        groups
            .into_par_iter()
            .map(|(key, rows)| {
                let report = match method {
                    ForecastMethod::MeanWindow => self.forecast(model, &rows, periods),
                    ForecastMethod::Autoregressive => {
                        self.forecast_autoregressive(model, &rows, periods)
                    }
                };
                (key, report)
            })
            .collect()
    }

    /// Checks the history length and orders rows by the date column, if any.
    fn prepare_history(&self, history: &[DatasetRow], required: usize) -> Result<Vec<DatasetRow>> {
        if history.len() < required {
            return Err(EngineError::InsufficientHistory {
                required,
                available: history.len(),
            });
        }
        let mut rows = history.to_vec();
        if let Some(column) = &self.config.date_column {
            let mut keyed = Vec::with_capacity(rows.len());
            for row in rows {
                let key = year_month_of(&row, column)?;
                keyed.push((key, row));
            }
            // stable: equal labels keep input order
            keyed.sort_by_key(|(key, _)| *key);
            rows = keyed.into_iter().map(|(_, row)| row).collect();
        }
        Ok(rows)
    }

    fn newest_year_month(&self, history: &[DatasetRow]) -> Result<Option<u32>> {
        match (&self.config.date_column, history.last()) {
            (Some(column), Some(row)) => year_month_of(row, column).map(Some),
            _ => Ok(None),
        }
    }

    fn floor(&self, value: f64) -> f64 {
        if self.config.non_negative {
            value.max(0.0)
        } else {
            value
        }
    }

    fn point(
        &self,
        period: usize,
        value: f64,
        historical_std: Option<f64>,
        year_month: Option<u32>,
    ) -> Result<ForecastPoint> {
        let margin = self.config.band.margin(value, historical_std)?;
        Ok(ForecastPoint {
            period: u32::try_from(period)
                .map_err(|_| EngineError::invalid(format!("too many periods: {}", period)))?,
            value,
            lower_bound: self.floor(value - margin),
            upper_bound: value + margin,
            year_month,
        })
    }

    fn report(
        &self,
        model: &TrainedModel,
        method: ForecastMethod,
        historical_std_dev: Option<f64>,
        history_rows: usize,
        points: Vec<ForecastPoint>,
    ) -> ForecastReport {
        ForecastReport {
            model_id: model.id,
            target_column: model.target_column.clone(),
            method,
            band: self.config.band,
            historical_std_dev,
            history_rows,
            points,
        }
    }
}

/// Per-feature mean over `rows`, skipping non-numeric cells.
fn window_means<'a>(
    rows: impl Iterator<Item = &'a DatasetRow> + Clone,
    features: &[String],
) -> Result<Vec<f64>> {
    features
        .iter()
        .map(|feature| {
            let (sum, count) = rows
                .clone()
                .filter_map(|row| row.number(feature))
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                Err(EngineError::invalid(format!(
                    "feature '{}' has no numeric value in the forecast window",
                    feature
                )))
            } else {
                Ok(sum / count as f64)
            }
        })
        .collect()
}

/// Newest numeric value of each feature, scanning `rows` from the back.
fn latest_values<'a>(
    rows: impl DoubleEndedIterator<Item = &'a DatasetRow> + Clone,
    features: &[String],
) -> Result<Vec<f64>> {
    features
        .iter()
        .map(|feature| {
            rows.clone()
                .rev()
                .find_map(|row| row.number(feature))
                .ok_or_else(|| {
                    EngineError::invalid(format!(
                        "feature '{}' has no numeric value in the forecast window",
                        feature
                    ))
                })
        })
        .collect()
}

/// Population standard deviation of the numeric target values.
fn target_std(rows: &[DatasetRow], target: &str) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(|r| r.number(target)).collect();
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

fn year_month_of(row: &DatasetRow, column: &str) -> Result<u32> {
    row.number(column)
        .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v as u32)
        .ok_or_else(|| {
            EngineError::invalid(format!("row has no YYYYMM value in column '{}'", column))
        })
}
