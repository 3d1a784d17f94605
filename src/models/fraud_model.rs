//! Fraud model: feature store, encoder and classifier wired together

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::feature_assembly::{categorical_rows, FeatureAssembler};
use crate::features::schema::transaction_features;
use crate::features::FeatureStore;
use crate::metrics::{stage, PipelineMetrics};
use crate::models::artifacts::ArtifactStore;
use crate::models::classifier::{ClassifierState, FraudClassifier};
use crate::models::encoder::OneHotEncoder;
use crate::types::transaction::CATEGORICAL_FEATURES;
use crate::types::{FeatureMatrix, InferenceRequest, Label, TransactionEvent};
use tracing::info;

/// Lifecycle of the model as seen by the entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Untrained,
    Trained,
}

/// Owns every collaborator needed to train and serve predictions
pub struct FraudModel<S: FeatureStore> {
    store: S,
    assembler: FeatureAssembler,
    encoder: OneHotEncoder,
    classifier: FraudClassifier,
    artifacts: ArtifactStore,
    metrics: PipelineMetrics,
}

impl<S: FeatureStore> FraudModel<S> {
    /// Build the model, loading any persisted encoder and classifier
    pub fn new(config: &AppConfig, store: S) -> Result<Self> {
        let artifacts = ArtifactStore::from_config(&config.artifacts);
        let classifier = artifacts.load_classifier(&config.classifier)?;
        let encoder = artifacts.load_encoder(config.features.unknown_category)?;
        let assembler =
            FeatureAssembler::new(&transaction_features(), config.features.missing_numeric_fill);

        info!(
            trained = classifier.is_trained(),
            encoder_fitted = encoder.is_fitted(),
            unknown_category = ?encoder.policy(),
            "Fraud model initialized"
        );

        Ok(Self {
            store,
            assembler,
            encoder,
            classifier,
            artifacts,
            metrics: PipelineMetrics::new(),
        })
    }

    /// Fit encoder and classifier on historical transactions and persist both
    pub fn train(&mut self, events: &[TransactionEvent]) -> Result<()> {
        info!(transactions = events.len(), "Training fraud model");

        let training = self.metrics.time(stage::HISTORICAL_FEATURES, || {
            self.assembler.training_records(&self.store, events)
        })?;

        let start = std::time::Instant::now();
        self.encoder
            .fit(&CATEGORICAL_FEATURES, &categorical_rows(&training.records))?;
        self.metrics.record_stage(stage::ENCODER_FIT, start.elapsed());
        self.artifacts.save_encoder(&self.encoder)?;

        let set = self.assembler.assemble_training(&self.encoder, &training)?;

        let start = std::time::Instant::now();
        self.classifier.fit(&set.x, &set.y)?;
        self.metrics.record_stage(stage::CLASSIFIER_FIT, start.elapsed());
        self.artifacts.save_classifier(&self.classifier)?;

        if let ClassifierState::Trained(model) = self.classifier.state() {
            self.metrics.record_training(model.summary());
        }
        Ok(())
    }

    /// Assemble the single-row feature matrix for a request
    pub fn features_for(&self, request: &InferenceRequest) -> Result<FeatureMatrix> {
        self.metrics.time(stage::ONLINE_FEATURES, || {
            self.assembler
                .assemble_inference(&self.store, &self.encoder, request)
        })
    }

    /// Classify one request
    pub fn predict(&self, request: &InferenceRequest) -> Result<Label> {
        let features = self.features_for(request)?;
        let labels = self
            .metrics
            .time(stage::PREDICT, || self.classifier.predict(&features))?;

        let label = labels.first().copied().ok_or_else(|| {
            PipelineError::InvalidInput("prediction produced no rows".to_string())
        })?;

        self.metrics.record_prediction(label);
        info!(transaction_id = request.transactionid(), label = %label, "Prediction complete");
        Ok(label)
    }

    pub fn is_model_trained(&self) -> bool {
        self.classifier.is_trained()
    }

    pub fn state(&self) -> ModelState {
        if self.is_model_trained() {
            ModelState::Trained
        } else {
            ModelState::Untrained
        }
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}
