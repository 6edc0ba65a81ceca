//! Tabular rows and the numeric datasets built from them.
//!
//! # Core Concepts
//!
//! - **Row** — a [`DatasetRow`] maps column names to a [`Value`], which is
//!   either a number or a string. Rows come from an external loader
//!   (CSV upload, database) and are validated there; the engine only reads them.
//! - **Dataset** — a source of `(X, y)` pairs where `X` has shape
//!   `(n_samples, n_features)` and `y` has shape `(n_samples,)`.
//!
//! # Example
//!
//! ```rust
//! use regress_forecast::dataset::{Dataset, DatasetRow, InMemoryDataset, Value};
//!
//! let rows = vec![
//!     DatasetRow::from_iter([("x", Value::from(1.0)), ("y", Value::from(2.0))]),
//!     DatasetRow::from_iter([("x", Value::from(2.0)), ("y", Value::from("4"))]),
//! ];
//! let features = vec!["x".to_string()];
//! let dataset = InMemoryDataset::from_rows(&rows, &features, "y").unwrap();
//! assert_eq!(dataset.n_samples(), 2);
//! ```

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod memory;
pub use self::memory::InMemoryDataset;

/// A single cell of a dataset row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Returns the numeric value of this cell, if it has one.
    ///
    /// Text cells holding a decimal number (e.g. `"12.5"`) are numeric.
    /// Non-finite values are treated as non-numeric.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// One row of tabular data: column name → value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetRow {
    cells: BTreeMap<String, Value>,
}

impl DatasetRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    /// Numeric value of `column`, or `None` when missing or non-numeric.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.cells.get(column).and_then(Value::as_number)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Values of `columns` as numbers, in order; `None` if any is missing
    /// or non-numeric.
    pub fn numbers(&self, columns: &[String]) -> Option<Vec<f64>> {
        columns.iter().map(|c| self.number(c)).collect()
    }
}

impl<K, V> FromIterator<(K, V)> for DatasetRow
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Abstract interface for a numeric regression dataset.
///
/// - `features()` — matrix with shape `(n_samples, n_features)`
/// - `labels()` — vector with shape `(n_samples,)`
pub trait Dataset {
    fn features(&self) -> ArrayView2<'_, f64>;

    fn labels(&self) -> ArrayView1<'_, f64>;

    fn n_samples(&self) -> usize {
        self.labels().len()
    }

    fn n_features(&self) -> usize {
        self.features().ncols()
    }

    fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }
}
