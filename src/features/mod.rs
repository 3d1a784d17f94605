//! Feature schema and feature store access

pub mod schema;
pub mod store;

pub use schema::{FeatureRef, FeatureRow, FeatureValue, FeatureView, ValueType};
pub use store::{EntityRow, FeatureStore, FileFeatureStore, SourceRow};
