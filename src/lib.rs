//! Fraud Classifier Library
//!
//! Trains and serves a binary fraud classifier: features come from a feature
//! store, categorical columns are one-hot encoded, and a gradient-boosted
//! tree ensemble makes the call.

pub mod config;
pub mod dataset;
pub mod error;
pub mod feature_assembly;
pub mod features;
pub mod metrics;
pub mod models;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use feature_assembly::FeatureAssembler;
pub use features::{FeatureStore, FileFeatureStore};
pub use models::{FraudModel, ModelState};
pub use types::{InferenceRequest, Label, TransactionEvent, TransactionFeatures};
