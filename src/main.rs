//! Fraud Classifier - Main Entry Point
//!
//! Trains the model from historical transactions if no persisted model exists,
//! then classifies one example transaction and prints the verdict.

use anyhow::{Context, Result};
use fraud_classifier::{
    config::{AppConfig, LoggingConfig},
    dataset,
    features::{schema::transaction_features, FileFeatureStore},
    FraudModel, InferenceRequest, ModelState,
};
use tracing::info;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!("fraud_classifier={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting fraud classifier");

    let transactions = dataset::load_transactions(&config.data.transactions_path)
        .with_context(|| format!("Failed to load {}", config.data.transactions_path))?;

    let store = FileFeatureStore::from_csv(transaction_features(), &config.feature_store.source_path)
        .with_context(|| format!("Failed to load {}", config.feature_store.source_path))?;
    info!(entities = store.entity_count(), "Feature store ready");

    let mut model = FraudModel::new(&config, store)?;

    if model.state() == ModelState::Untrained {
        model.train(&transactions).context("Training failed")?;
    } else {
        info!("Persisted model found, skipping training");
    }

    let request = InferenceRequest::example();
    let label = model.predict(&request).context("Prediction failed")?;

    println!("{}", label.verdict());

    model.metrics().print_summary();
    Ok(())
}
