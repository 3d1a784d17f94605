//! Type definitions for the fraud classifier

pub mod label;
pub mod matrix;
pub mod transaction;

pub use label::Label;
pub use matrix::FeatureMatrix;
pub use transaction::{InferenceRequest, TransactionEvent, TransactionFeatures};
