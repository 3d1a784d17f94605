//! Transaction data structures for fraud classification

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Categorical features, in the order the encoder consumes them
pub const CATEGORICAL_FEATURES: [&str; 7] = [
    "productcd",
    "p_emaildomain",
    "r_emaildomain",
    "card4",
    "m1",
    "m2",
    "m3",
];

/// The single raw numeric feature passed through to the classifier
pub const NUMERIC_FEATURE: &str = "transactionamt";

/// One row of the historical batch file, used to drive the point-in-time join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Entity id
    pub transactionid: i64,

    /// Time at which the transaction happened
    pub event_timestamp: DateTime<Utc>,

    /// Fraud label (training data only)
    #[serde(deserialize_with = "deserialize_flag")]
    pub isfraud: bool,
}

/// Accepts `0`/`1` as well as `true`/`false`
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "1.0" => Ok(true),
        "0" | "false" | "0.0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid fraud flag {other:?}"
        ))),
    }
}

/// Full transaction feature record: categorical attributes plus amount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFeatures {
    pub transactionid: i64,
    pub transactionamt: Option<f64>,
    pub productcd: Option<String>,
    pub p_emaildomain: Option<String>,
    pub r_emaildomain: Option<String>,
    pub card4: Option<String>,
    pub m1: Option<String>,
    pub m2: Option<String>,
    pub m3: Option<String>,
}

impl TransactionFeatures {
    /// Categorical values in [`CATEGORICAL_FEATURES`] order
    pub fn categorical_values(&self) -> [Option<&str>; 7] {
        [
            self.productcd.as_deref(),
            self.p_emaildomain.as_deref(),
            self.r_emaildomain.as_deref(),
            self.card4.as_deref(),
            self.m1.as_deref(),
            self.m2.as_deref(),
            self.m3.as_deref(),
        ]
    }

    /// Mutable access to a categorical field by feature name
    pub fn categorical_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "productcd" => Some(&mut self.productcd),
            "p_emaildomain" => Some(&mut self.p_emaildomain),
            "r_emaildomain" => Some(&mut self.r_emaildomain),
            "card4" => Some(&mut self.card4),
            "m1" => Some(&mut self.m1),
            "m2" => Some(&mut self.m2),
            "m3" => Some(&mut self.m3),
            _ => None,
        }
    }
}

/// Ad hoc inference request, validated on construction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    features: TransactionFeatures,
}

impl InferenceRequest {
    /// Validate and wrap a feature record
    pub fn new(features: TransactionFeatures) -> Result<Self> {
        if features.transactionid < 0 {
            return Err(PipelineError::InvalidRequest(format!(
                "transactionid must be non-negative, got {}",
                features.transactionid
            )));
        }

        if let Some(amount) = features.transactionamt {
            if !amount.is_finite() || amount < 0.0 {
                return Err(PipelineError::InvalidRequest(format!(
                    "transactionamt must be a finite non-negative number, got {amount}"
                )));
            }
        }

        for (name, value) in CATEGORICAL_FEATURES
            .iter()
            .zip(features.categorical_values())
        {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(PipelineError::InvalidRequest(format!(
                    "{name} must not be an empty string"
                )));
            }
        }

        Ok(Self { features })
    }

    /// Parse a request from JSON; unrecognised fields are rejected
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawRequest = serde_json::from_str(json)?;
        Self::new(raw.into())
    }

    /// The example request scored by the entry point
    pub fn example() -> Self {
        Self {
            features: TransactionFeatures {
                transactionid: 3577537,
                transactionamt: Some(30.95),
                productcd: Some("W".to_string()),
                p_emaildomain: Some("gmail.com".to_string()),
                r_emaildomain: None,
                card4: Some("mastercard".to_string()),
                m1: Some("T".to_string()),
                m2: Some("F".to_string()),
                m3: Some("F".to_string()),
            },
        }
    }

    pub fn transactionid(&self) -> i64 {
        self.features.transactionid
    }

    pub fn features(&self) -> &TransactionFeatures {
        &self.features
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequest {
    transactionid: i64,
    #[serde(default)]
    transactionamt: Option<f64>,
    #[serde(default)]
    productcd: Option<String>,
    #[serde(default)]
    p_emaildomain: Option<String>,
    #[serde(default)]
    r_emaildomain: Option<String>,
    #[serde(default)]
    card4: Option<String>,
    #[serde(default)]
    m1: Option<String>,
    #[serde(default)]
    m2: Option<String>,
    #[serde(default)]
    m3: Option<String>,
}

impl From<RawRequest> for TransactionFeatures {
    fn from(raw: RawRequest) -> Self {
        Self {
            transactionid: raw.transactionid,
            transactionamt: raw.transactionamt,
            productcd: raw.productcd,
            p_emaildomain: raw.p_emaildomain,
            r_emaildomain: raw.r_emaildomain,
            card4: raw.card4,
            m1: raw.m1,
            m2: raw.m2,
            m3: raw.m3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_request_is_valid() {
        let request = InferenceRequest::example();
        let validated = InferenceRequest::new(request.features().clone()).unwrap();
        assert_eq!(validated.transactionid(), 3577537);
        assert_eq!(validated.features().r_emaildomain, None);
    }

    #[test]
    fn test_request_from_json() {
        let request = InferenceRequest::from_json(
            r#"{"transactionid": 3577537, "transactionamt": 30.95, "productcd": "W",
                "card4": "mastercard", "p_emaildomain": "gmail.com", "r_emaildomain": null,
                "m1": "T", "m2": "F", "m3": "F"}"#,
        )
        .unwrap();
        assert_eq!(request, InferenceRequest::example());
    }

    #[test]
    fn test_request_rejects_unknown_field() {
        let result = InferenceRequest::from_json(r#"{"transactionid": 1, "card5": "x"}"#);
        assert!(matches!(result, Err(PipelineError::Json(_))));
    }

    #[test]
    fn test_request_rejects_negative_amount() {
        let features = TransactionFeatures {
            transactionid: 1,
            transactionamt: Some(-3.0),
            ..Default::default()
        };
        assert!(matches!(
            InferenceRequest::new(features),
            Err(PipelineError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_request_rejects_empty_category() {
        let features = TransactionFeatures {
            transactionid: 1,
            card4: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            InferenceRequest::new(features),
            Err(PipelineError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_event_flag_parsing() {
        let mut reader = csv::Reader::from_reader(
            "transactionid,event_timestamp,isfraud\n\
             1,2024-01-01T00:00:00Z,1\n\
             2,2024-01-02T00:00:00Z,false\n"
                .as_bytes(),
        );
        let events: Vec<TransactionEvent> = reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert!(events[0].isfraud);
        assert!(!events[1].isfraud);
    }
}
