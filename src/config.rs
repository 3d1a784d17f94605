//! Configuration management for the fraud classifier

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the encoder does with a categorical value it never saw during fit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategoryPolicy {
    /// Reject the row with an error
    #[default]
    Error,
    /// Encode the value as an all-zero indicator block
    Ignore,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub feature_store: FeatureStoreConfig,
    pub artifacts: ArtifactsConfig,
    pub features: FeaturesConfig,
    pub classifier: ClassifierConfig,
    pub logging: LoggingConfig,
}

/// Historical data location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV with transactionid, event_timestamp and isfraud columns
    pub transactions_path: String,
}

/// Feature store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStoreConfig {
    /// CSV rendering of the batch source table
    pub source_path: String,
}

/// Persisted artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    pub model_path: String,
    pub encoder_path: String,
}

/// Feature assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default)]
    pub unknown_category: UnknownCategoryPolicy,
    /// Value used when a numeric feature is missing
    #[serde(default)]
    pub missing_numeric_fill: f64,
}

/// Gradient-boosted tree hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub n_estimators: usize,
    pub max_depth: u16,
    pub learning_rate: f64,
    pub min_child_weight: usize,
    pub lambda: f64,
    pub subsample: f64,
    pub seed: u64,
    /// Scores at or above this value are labelled fraudulent
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from defaults, `config/config.toml` and `FRAUD__*` env vars
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration layering an optional file over the defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())
            .context("Failed to build default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("FRAUD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                transactions_path: "data/train_transaction.csv".to_string(),
            },
            feature_store: FeatureStoreConfig {
                source_path: "data/transaction_features.csv".to_string(),
            },
            artifacts: ArtifactsConfig {
                model_path: "fraud_model.bin".to_string(),
                encoder_path: "encoder.bin".to_string(),
            },
            features: FeaturesConfig {
                unknown_category: UnknownCategoryPolicy::Error,
                missing_numeric_fill: 0.0,
            },
            classifier: ClassifierConfig {
                n_estimators: 100,
                max_depth: 6,
                learning_rate: 0.3,
                min_child_weight: 1,
                lambda: 1.0,
                subsample: 1.0,
                seed: 0,
                threshold: default_threshold(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.data.transactions_path, "data/train_transaction.csv");
        assert_eq!(config.artifacts.model_path, "fraud_model.bin");
        assert_eq!(config.features.unknown_category, UnknownCategoryPolicy::Error);
        assert_eq!(config.classifier.threshold, 0.5);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.classifier.n_estimators, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[classifier]\nn_estimators = 10\nmax_depth = 3\n\n[features]\nunknown_category = \"ignore\""
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.classifier.n_estimators, 10);
        assert_eq!(config.classifier.max_depth, 3);
        assert_eq!(config.classifier.learning_rate, 0.3);
        assert_eq!(
            config.features.unknown_category,
            UnknownCategoryPolicy::Ignore
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nformat = \"pretty\"").unwrap();

        std::env::set_var("FRAUD__LOGGING__FORMAT", "json");
        let config = AppConfig::load_from_path(file.path());
        std::env::remove_var("FRAUD__LOGGING__FORMAT");

        assert_eq!(config.unwrap().logging.format, "json");
    }
}
