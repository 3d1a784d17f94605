//! Persisted encoder and classifier artifacts

use crate::config::{ArtifactsConfig, ClassifierConfig, UnknownCategoryPolicy};
use crate::error::Result;
use crate::models::classifier::FraudClassifier;
use crate::models::encoder::OneHotEncoder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Loads and saves the two model artifacts as bincode blobs
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    model_path: PathBuf,
    encoder_path: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, encoder_path: Q) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            encoder_path: encoder_path.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self::new(&config.model_path, &config.encoder_path)
    }

    /// Load the persisted classifier, or a fresh untrained one if absent
    pub fn load_classifier(&self, params: &ClassifierConfig) -> Result<FraudClassifier> {
        match load_artifact::<FraudClassifier>(&self.model_path)? {
            Some(classifier) => Ok(classifier),
            None => {
                info!(path = %self.model_path.display(), "No persisted model, starting untrained");
                Ok(FraudClassifier::new(params.clone()))
            }
        }
    }

    /// Load the persisted encoder, or a fresh unfitted one if absent
    pub fn load_encoder(&self, policy: UnknownCategoryPolicy) -> Result<OneHotEncoder> {
        match load_artifact::<OneHotEncoder>(&self.encoder_path)? {
            Some(mut encoder) => {
                encoder.set_policy(policy);
                Ok(encoder)
            }
            None => {
                info!(path = %self.encoder_path.display(), "No persisted encoder, starting unfitted");
                Ok(OneHotEncoder::new(policy))
            }
        }
    }

    pub fn save_classifier(&self, classifier: &FraudClassifier) -> Result<()> {
        save_artifact(&self.model_path, classifier)
    }

    pub fn save_encoder(&self, encoder: &OneHotEncoder) -> Result<()> {
        save_artifact(&self.encoder_path, encoder)
    }
}

/// Deserialize an artifact; `None` when the file does not exist
pub fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(path)?);
    let value = bincode::deserialize_from(reader)?;
    info!(path = %path.display(), "Loaded artifact");
    Ok(Some(value))
}

/// Serialize an artifact, overwriting any existing file
pub fn save_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, value)?;
    info!(path = %path.display(), "Saved artifact");
    Ok(())
}
