//! Feature importance from linear coefficients.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Relative contribution of one input feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Ranks features by `|c_i| / Σ|c_j|`, highest first.
///
/// Ties keep the input order. If every coefficient is zero, every feature
/// gets importance 0.
///
/// ```rust
/// use regress_forecast::importance::rank;
///
/// let names = ["a", "b", "c"].map(String::from);
/// let ranked = rank(&names, &[0.5, -2.0, 0.0]).unwrap();
/// assert_eq!(ranked[0].feature, "b");
/// assert!((ranked[0].importance - 0.8).abs() < 1e-12);
/// ```
pub fn rank(feature_names: &[String], coefficients: &[f64]) -> Result<Vec<FeatureImportance>> {
    if feature_names.len() != coefficients.len() {
        return Err(EngineError::invalid(format!(
            "{} feature names but {} coefficients",
            feature_names.len(),
            coefficients.len()
        )));
    }

    let total: f64 = coefficients.iter().map(|c| c.abs()).sum();
    let mut ranked: Vec<FeatureImportance> = feature_names
        .iter()
        .zip(coefficients)
        .map(|(name, c)| FeatureImportance {
            feature: name.clone(),
            importance: if total > 0.0 { c.abs() / total } else { 0.0 },
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_rank_orders_by_magnitude() {
        let ranked = rank(&names(&["a", "b", "c"]), &[0.5, -2.0, 0.0]).unwrap();
        let order: Vec<&str> = ranked.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert!((ranked[0].importance - 0.8).abs() < 1e-12);
        assert!((ranked[1].importance - 0.2).abs() < 1e-12);
        assert_eq!(ranked[2].importance, 0.0);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let ranked = rank(&names(&["x", "y", "z"]), &[1.0, -1.0, 1.0]).unwrap();
        let order: Vec<&str> = ranked.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_rank_all_zero() {
        let ranked = rank(&names(&["a", "b"]), &[0.0, 0.0]).unwrap();
        assert!(ranked.iter().all(|f| f.importance == 0.0));
        assert_eq!(ranked[0].feature, "a");
    }

    #[test]
    fn test_rank_length_mismatch() {
        assert!(matches!(
            rank(&names(&["a"]), &[1.0, 2.0]),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(&[], &[]).unwrap().is_empty());
    }
}
