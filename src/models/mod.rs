//! Encoder, classifier and their persistence

pub mod artifacts;
pub mod classifier;
pub mod encoder;
pub mod fraud_model;

pub use artifacts::ArtifactStore;
pub use classifier::{ClassifierState, FraudClassifier};
pub use encoder::OneHotEncoder;
pub use fraud_model::{FraudModel, ModelState};
