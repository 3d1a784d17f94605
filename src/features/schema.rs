//! Declarative feature schema for transaction features
//!
//! Everything here is static metadata consumed by the feature store: the
//! entity key, the feature view with its value types and TTL, and the batch
//! source the view is materialised from.

use crate::error::{PipelineError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Feature view holding the transaction attributes
pub const TRANSACTION_VIEW: &str = "transaction_features";

/// Entity key column
pub const TRANSACTION_ENTITY: &str = "transactionid";

/// Value types a feature can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Int64,
    Double,
    String,
}

/// Join key shared by all feature views of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub value_type: ValueType,
}

/// A named, typed feature column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub dtype: ValueType,
}

impl Feature {
    fn new(name: &str, dtype: ValueType) -> Self {
        Self {
            name: name.to_string(),
            dtype,
        }
    }
}

/// Warehouse query backing a feature view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSource {
    pub query: String,
    pub event_timestamp_column: String,
    pub created_timestamp_column: String,
}

/// Group of features sharing an entity, TTL and batch source
#[derive(Debug, Clone)]
pub struct FeatureView {
    pub name: String,
    pub entities: Vec<String>,
    /// Maximum age of a value relative to the entity timestamp
    pub ttl: Duration,
    pub features: Vec<Feature>,
    pub batch_source: BatchSource,
}

impl FeatureView {
    /// Look up a declared feature by name
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    /// References to every feature of this view
    pub fn feature_refs(&self) -> Vec<FeatureRef> {
        self.features
            .iter()
            .map(|f| FeatureRef {
                view: self.name.clone(),
                feature: f.name.clone(),
            })
            .collect()
    }
}

pub fn transaction_entity() -> Entity {
    Entity {
        name: TRANSACTION_ENTITY.to_string(),
        value_type: ValueType::Int64,
    }
}

/// The `transaction_features` view
pub fn transaction_features() -> FeatureView {
    FeatureView {
        name: TRANSACTION_VIEW.to_string(),
        entities: vec![transaction_entity().name],
        ttl: Duration::days(30),
        features: vec![
            Feature::new("productcd", ValueType::String),
            Feature::new("transactionamt", ValueType::Double),
            Feature::new("p_emaildomain", ValueType::String),
            Feature::new("r_emaildomain", ValueType::String),
            Feature::new("card4", ValueType::String),
            Feature::new("m1", ValueType::String),
            Feature::new("m2", ValueType::String),
            Feature::new("m3", ValueType::String),
        ],
        batch_source: BatchSource {
            query: "SELECT * FROM spectrum.transaction_features".to_string(),
            event_timestamp_column: "event_timestamp".to_string(),
            created_timestamp_column: "created_timestamp".to_string(),
        },
    }
}

/// `view:feature` reference used when requesting features
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureRef {
    pub view: String,
    pub feature: String,
}

impl FromStr for FeatureRef {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((view, feature)) if !view.is_empty() && !feature.is_empty() => Ok(Self {
                view: view.to_string(),
                feature: feature.to_string(),
            }),
            _ => Err(PipelineError::UnknownFeature(s.to_string())),
        }
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.view, self.feature)
    }
}

/// A single feature value as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    String(String),
    Double(f64),
    Int64(i64),
    Null,
}

impl FeatureValue {
    /// Parse a raw cell by declared type; an empty cell is `Null`
    ///
    /// Non-finite doubles (`NaN`, `inf`) are also `Null` so they get the
    /// same fill as missing values downstream.
    pub fn parse(raw: &str, dtype: ValueType) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(FeatureValue::Null);
        }

        match dtype {
            ValueType::String => Ok(FeatureValue::String(raw.to_string())),
            ValueType::Double => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(FeatureValue::Double(v)),
                Ok(_) => Ok(FeatureValue::Null),
                Err(_) => Err(PipelineError::InvalidInput(format!("not a DOUBLE: {raw:?}"))),
            },
            ValueType::Int64 => raw
                .parse::<i64>()
                .map(FeatureValue::Int64)
                .map_err(|_| PipelineError::InvalidInput(format!("not an INT64: {raw:?}"))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Double(v) => Some(*v),
            FeatureValue::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }
}

/// Feature values retrieved for one entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    pub entity_id: i64,
    pub values: BTreeMap<String, FeatureValue>,
}

impl FeatureRow {
    pub fn get(&self, feature: &str) -> &FeatureValue {
        self.values.get(feature).unwrap_or(&FeatureValue::Null)
    }
}
