//! Feature assembly for training and inference.
//!
//! Both paths produce the same layout: one-hot encoded categorical columns
//! plus the raw `transactionamt` column, with all columns sorted by name.
//! The classifier relies on this layout being identical between the two.

use crate::error::{PipelineError, Result};
use crate::features::{EntityRow, FeatureRef, FeatureRow, FeatureStore, FeatureView};
use crate::models::encoder::OneHotEncoder;
use crate::types::transaction::{CATEGORICAL_FEATURES, NUMERIC_FEATURE};
use crate::types::{FeatureMatrix, InferenceRequest, Label, TransactionEvent, TransactionFeatures};
use tracing::{debug, warn};

/// Feature records and labels retrieved for training
#[derive(Debug, Clone)]
pub struct TrainingRecords {
    pub records: Vec<TransactionFeatures>,
    pub labels: Vec<Label>,
}

/// Assembled training matrix with its separate label vector
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub x: FeatureMatrix,
    pub y: Vec<Label>,
}

/// Retrieves features from the store and lays them out for the classifier
pub struct FeatureAssembler {
    feature_refs: Vec<FeatureRef>,
    missing_numeric_fill: f64,
}

impl FeatureAssembler {
    /// Request every feature of `view`
    pub fn new(view: &FeatureView, missing_numeric_fill: f64) -> Self {
        Self {
            feature_refs: view.feature_refs(),
            missing_numeric_fill,
        }
    }

    /// Historical features joined as-of each event, plus labels
    pub fn training_records<S: FeatureStore + ?Sized>(
        &self,
        store: &S,
        events: &[TransactionEvent],
    ) -> Result<TrainingRecords> {
        if events.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "no historical transactions to train on".to_string(),
            ));
        }

        let entity_rows: Vec<EntityRow> = events.iter().map(EntityRow::from).collect();
        let rows = store.get_historical_features(&entity_rows, &self.feature_refs)?;
        if rows.len() != events.len() {
            return Err(PipelineError::InvalidInput(format!(
                "feature store returned {} rows for {} entities",
                rows.len(),
                events.len()
            )));
        }

        let records = rows.iter().map(record_from_row).collect();
        let labels = events.iter().map(|e| Label::from_flag(e.isfraud)).collect();

        Ok(TrainingRecords { records, labels })
    }

    /// Request merged with its latest online features
    ///
    /// A non-null online value replaces the request's value; a null one keeps it.
    pub fn inference_record<S: FeatureStore + ?Sized>(
        &self,
        store: &S,
        request: &InferenceRequest,
    ) -> Result<TransactionFeatures> {
        let online = store.get_online_features(&[request.transactionid()], &self.feature_refs)?;
        let row = online.first().ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "feature store returned no row for transaction {}",
                request.transactionid()
            ))
        })?;

        let mut record = request.features().clone();
        for name in CATEGORICAL_FEATURES {
            if let (Some(value), Some(slot)) = (row.get(name).as_str(), record.categorical_mut(name)) {
                *slot = Some(value.to_string());
            }
        }
        if let Some(amount) = row.get(NUMERIC_FEATURE).as_f64() {
            record.transactionamt = Some(amount);
        }

        debug!(transaction_id = record.transactionid, "Merged online features into request");
        Ok(record)
    }

    /// Encode categorical columns, append the amount, sort columns by name
    pub fn assemble(
        &self,
        encoder: &OneHotEncoder,
        records: &[TransactionFeatures],
    ) -> Result<FeatureMatrix> {
        let mut matrix = encoder.transform(&categorical_rows(records))?;

        let mut missing = 0usize;
        let amounts: Vec<f64> = records
            .iter()
            .map(|r| {
                r.transactionamt.unwrap_or_else(|| {
                    missing += 1;
                    self.missing_numeric_fill
                })
            })
            .collect();
        if missing > 0 {
            warn!(
                missing,
                fill = self.missing_numeric_fill,
                "Filled missing {} values",
                NUMERIC_FEATURE
            );
        }

        matrix.append_column(NUMERIC_FEATURE, &amounts)?;
        matrix.sort_columns();
        Ok(matrix)
    }

    /// Assemble an already retrieved training set
    pub fn assemble_training(
        &self,
        encoder: &OneHotEncoder,
        training: &TrainingRecords,
    ) -> Result<TrainingSet> {
        Ok(TrainingSet {
            x: self.assemble(encoder, &training.records)?,
            y: training.labels.clone(),
        })
    }

    /// Single-row inference matrix for a request
    pub fn assemble_inference<S: FeatureStore + ?Sized>(
        &self,
        store: &S,
        encoder: &OneHotEncoder,
        request: &InferenceRequest,
    ) -> Result<FeatureMatrix> {
        let record = self.inference_record(store, request)?;
        self.assemble(encoder, std::slice::from_ref(&record))
    }
}

/// Categorical values of each record, in encoder column order
pub fn categorical_rows(records: &[TransactionFeatures]) -> Vec<Vec<Option<&str>>> {
    records
        .iter()
        .map(|r| r.categorical_values().to_vec())
        .collect()
}

fn record_from_row(row: &FeatureRow) -> TransactionFeatures {
    let text = |name: &str| row.get(name).as_str().map(str::to_string);

    TransactionFeatures {
        transactionid: row.entity_id,
        transactionamt: row.get(NUMERIC_FEATURE).as_f64(),
        productcd: text("productcd"),
        p_emaildomain: text("p_emaildomain"),
        r_emaildomain: text("r_emaildomain"),
        card4: text("card4"),
        m1: text("m1"),
        m2: text("m2"),
        m3: text("m3"),
    }
}
