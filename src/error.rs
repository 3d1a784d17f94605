//! Error types for the fraud classifier library

use thiserror::Error;

/// Errors raised while assembling features, training or predicting
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Artifact serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Model error: {0}")]
    Model(#[from] smartcore::error::Failed),

    /// Request failed validation at construction
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed matrix, label vector or source row
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Feature reference not declared by any registered feature view
    #[error("Unknown feature reference: {0}")]
    UnknownFeature(String),

    /// Categorical value that was not observed when the encoder was fit
    #[error("Unknown category {value:?} for feature {feature}")]
    UnknownCategory { feature: String, value: String },

    #[error("Encoder has not been fitted")]
    EncoderNotFitted,

    #[error("Model has not been trained")]
    ModelNotTrained,

    /// Column set or order differs from what the classifier was fit on
    #[error("Feature mismatch at column {position}: expected {expected}, got {actual}")]
    FeatureMismatch {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),
}

/// Result type for library operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_category_message() {
        let error = PipelineError::UnknownCategory {
            feature: "card4".to_string(),
            value: "discover".to_string(),
        };
        assert!(error.to_string().contains("card4"));
        assert!(error.to_string().contains("discover"));
    }

    #[test]
    fn test_feature_mismatch_message() {
        let error = PipelineError::FeatureMismatch {
            position: 0,
            expected: "card4_discover".to_string(),
            actual: "transactionamt".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Feature mismatch at column 0: expected card4_discover, got transactionamt"
        );
    }
}
