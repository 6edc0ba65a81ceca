//! Data preprocessing transformers.
//!
//! Transformers follow a fit-once, apply-many pattern: parameters are
//! learned from the training split only and then applied unchanged to
//! test rows, prediction inputs and forecast windows.
//!
//! # Core Traits
//!
//! - [`Transformer`]: Unfitted transformer with hyperparameters
//! - [`FittedTransformer`]: Fitted transformer ready for inference
//!
//! # Available Transformers
//!
//! - [`FeatureStandardizer`]: Z-score normalization producing
//!   [`StandardizationParams`]

pub mod standard;
pub mod traits;

pub use standard::{FeatureStandardizer, FeatureStats, StandardizationParams};
pub use traits::{FittedTransformer, Transformer};
