//! Registry of trained models.
//!
//! Models are created once and read many times: a stored
//! [`TrainedModel`] is never mutated. Retraining stores a new model under a
//! fresh [`ModelId`] and drops the old one.

use crate::dataset::DatasetRow;
use crate::engine::{TrainRequest, TrainedModel};
use crate::error::{EngineError, Result};
use crate::metrics::EvaluationMetrics;
use chrono::{DateTime, Utc};
use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of a trained model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(Uuid);

impl ModelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModelId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| EngineError::invalid(format!("invalid model id '{}': {}", s, e)))
    }
}

/// Listing entry of a stored model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSummary {
    pub id: ModelId,
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub evaluation: EvaluationMetrics,
    pub created_at: DateTime<Utc>,
}

impl From<&TrainedModel> for ModelSummary {
    fn from(model: &TrainedModel) -> Self {
        Self {
            id: model.id,
            feature_names: model.feature_names.clone(),
            target_column: model.target_column.clone(),
            evaluation: model.evaluation,
            created_at: model.created_at,
        }
    }
}

/// Storage for trained models, injected wherever models are looked up.
pub trait ModelStore: Send + Sync {
    /// Stores `model` under its own id and returns that id.
    fn save(&self, model: TrainedModel) -> ModelId;

    fn load(&self, id: &ModelId) -> Result<Arc<TrainedModel>>;

    /// Summaries of every stored model, oldest first.
    fn list(&self) -> Vec<ModelSummary>;

    /// Removes and returns the model.
    fn remove(&self, id: &ModelId) -> Result<Arc<TrainedModel>>;

    fn contains(&self, id: &ModelId) -> bool {
        self.load(id).is_ok()
    }
}

/// Process-local [`ModelStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    models: RwLock<HashMap<ModelId, Arc<TrainedModel>>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}

impl ModelStore for InMemoryModelStore {
    fn save(&self, model: TrainedModel) -> ModelId {
        let id = model.id;
        self.models.write().insert(id, Arc::new(model));
        id
    }

    fn load(&self, id: &ModelId) -> Result<Arc<TrainedModel>> {
        self.models
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::ModelNotFound(id.to_string()))
    }

    fn list(&self) -> Vec<ModelSummary> {
        let mut summaries: Vec<ModelSummary> = self
            .models
            .read()
            .values()
            .map(|m| ModelSummary::from(m.as_ref()))
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        summaries
    }

    fn remove(&self, id: &ModelId) -> Result<Arc<TrainedModel>> {
        self.models
            .write()
            .remove(id)
            .ok_or_else(|| EngineError::ModelNotFound(id.to_string()))
    }
}

/// Trains a replacement for `old_id` and swaps it into `store`.
///
/// The old model is only removed once the new one trained successfully, so
/// a failed retrain leaves the store untouched.
pub fn retrain<S: ModelStore + ?Sized>(
    store: &S,
    old_id: &ModelId,
    rows: &[DatasetRow],
    request: &TrainRequest,
) -> Result<ModelId> {
    if !store.contains(old_id) {
        return Err(EngineError::ModelNotFound(old_id.to_string()));
    }
    let model = request.train(rows)?;
    store.remove(old_id)?;
    let new_id = store.save(model);
    info!("retrained model {} as {}", old_id, new_id);
    Ok(new_id)
}
