use crate::dataset::{Dataset, DatasetRow};
use crate::error::{EngineError, Result};
use log::warn;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

/// A dense, in-memory regression dataset.
#[derive(Clone, Debug)]
pub struct InMemoryDataset {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl InMemoryDataset {
    pub fn new(x: Vec<Vec<f64>>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(EngineError::invalid("x and y must have same length"));
        }
        if x.is_empty() {
            return Err(EngineError::invalid("Dataset is empty"));
        }
        let n_features = x[0].len();
        if !x.iter().all(|row| row.len() == n_features) {
            return Err(EngineError::invalid(
                "All rows must have the same number of features",
            ));
        }
        let n_samples = x.len();
        let data = x.into_iter().flatten().collect();
        let x = Array2::from_shape_vec((n_samples, n_features), data)
            .map_err(|e| EngineError::invalid(e.to_string()))?;
        Ok(Self {
            x,
            y: Array1::from(y),
        })
    }

    /// Wraps already-shaped arrays.
    pub fn from_arrays(x: Array2<f64>, y: Array1<f64>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(EngineError::invalid(format!(
                "x has {} rows but y has {} values",
                x.nrows(),
                y.len()
            )));
        }
        Ok(Self { x, y })
    }

    /// Builds training examples from raw rows.
    ///
    /// Rows where the target or any selected feature is missing or
    /// non-numeric are dropped. A column that no row contains is an error.
    pub fn from_rows(
        rows: &[DatasetRow],
        selected_features: &[String],
        target_column: &str,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(EngineError::invalid("no rows supplied"));
        }
        if selected_features.is_empty() {
            return Err(EngineError::invalid("at least one feature must be selected"));
        }
        for column in selected_features
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(target_column))
        {
            if !rows.iter().any(|row| row.contains(column)) {
                return Err(EngineError::invalid(format!("unknown column '{}'", column)));
            }
        }

        let mut features = Vec::with_capacity(rows.len() * selected_features.len());
        let mut labels = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(label) = row.number(target_column) else {
                continue;
            };
            let Some(values) = row.numbers(selected_features) else {
                continue;
            };
            features.extend(values);
            labels.push(label);
        }

        let discarded = rows.len() - labels.len();
        if discarded > 0 {
            warn!(
                "discarded {} of {} rows with non-numeric values",
                discarded,
                rows.len()
            );
        }
        if labels.is_empty() {
            return Err(EngineError::invalid(format!(
                "no row has numeric values for all of {:?} and target '{}'",
                selected_features, target_column
            )));
        }

        let x = Array2::from_shape_vec((labels.len(), selected_features.len()), features)
            .map_err(|e| EngineError::invalid(e.to_string()))?;
        Ok(Self {
            x,
            y: Array1::from(labels),
        })
    }

    /// Chronological split: the first `1 - test_ratio` share of rows trains,
    /// the rest is held out. Rows are never shuffled.
    pub fn split(&self, test_ratio: f64) -> Result<(Self, Self)> {
        if !(0.0..1.0).contains(&test_ratio) {
            return Err(EngineError::invalid(format!(
                "test ratio must be in [0, 1), got {}",
                test_ratio
            )));
        }
        let n = self.y.len();
        let split_index = (n as f64 * (1.0 - test_ratio)).floor() as usize;
        if split_index == 0 {
            return Err(EngineError::invalid(format!(
                "training split is empty ({} rows, test ratio {})",
                n, test_ratio
            )));
        }
        let train = Self {
            x: self.x.slice(s![..split_index, ..]).to_owned(),
            y: self.y.slice(s![..split_index]).to_owned(),
        };
        let test = Self {
            x: self.x.slice(s![split_index.., ..]).to_owned(),
            y: self.y.slice(s![split_index..]).to_owned(),
        };
        Ok((train, test))
    }

    /// Returns a copy with features replaced (e.g. after standardization).
    pub fn with_features(&self, x: Array2<f64>) -> Result<Self> {
        Self::from_arrays(x, self.y.clone())
    }
}

impl Dataset for InMemoryDataset {
    fn features(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    fn labels(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }
}
