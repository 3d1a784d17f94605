//! One-hot encoding of categorical string features

use crate::config::UnknownCategoryPolicy;
use crate::error::{PipelineError, Result};
use crate::types::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Suffix used for the indicator column of a missing value
const MISSING_CATEGORY: &str = "None";

/// Observed value domain of one categorical feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDomain {
    pub feature: String,
    /// Sorted observed values; a missing value, if seen, comes last
    pub categories: Vec<Option<String>>,
}

impl CategoryDomain {
    fn column_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories.iter().map(move |c| {
            format!(
                "{}_{}",
                self.feature,
                c.as_deref().unwrap_or(MISSING_CATEGORY)
            )
        })
    }

    fn position(&self, value: Option<&str>) -> Option<usize> {
        self.categories.iter().position(|c| c.as_deref() == value)
    }
}

/// Whether the encoder has learned its domains yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EncoderState {
    Unfitted,
    Fitted(Vec<CategoryDomain>),
}

/// Maps each categorical column onto a block of indicator columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    state: EncoderState,
    #[serde(default)]
    policy: UnknownCategoryPolicy,
}

impl OneHotEncoder {
    pub fn new(policy: UnknownCategoryPolicy) -> Self {
        Self {
            state: EncoderState::Unfitted,
            policy,
        }
    }

    /// Learn the domain of every column, replacing any earlier state
    pub fn fit(&mut self, features: &[&str], rows: &[Vec<Option<&str>>]) -> Result<()> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot fit encoder on zero rows".to_string(),
            ));
        }

        let mut observed: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); features.len()];
        let mut has_missing = vec![false; features.len()];

        for row in rows {
            check_width(features.len(), row.len())?;
            for (col, value) in row.iter().enumerate() {
                match value {
                    Some(v) => {
                        observed[col].insert(*v);
                    }
                    None => has_missing[col] = true,
                }
            }
        }

        let domains: Vec<CategoryDomain> = features
            .iter()
            .zip(observed)
            .zip(has_missing)
            .map(|((feature, values), missing)| {
                let mut categories: Vec<Option<String>> =
                    values.into_iter().map(|v| Some(v.to_string())).collect();
                if missing {
                    categories.push(None);
                }
                CategoryDomain {
                    feature: feature.to_string(),
                    categories,
                }
            })
            .collect();

        for domain in &domains {
            debug!(
                feature = %domain.feature,
                categories = domain.categories.len(),
                "Fitted category domain"
            );
        }

        self.state = EncoderState::Fitted(domains);
        info!(
            features = features.len(),
            columns = self.feature_names_out().map(|n| n.len()).unwrap_or(0),
            "One-hot encoder fitted"
        );
        Ok(())
    }

    /// Encode rows using the fitted domains
    pub fn transform(&self, rows: &[Vec<Option<&str>>]) -> Result<FeatureMatrix> {
        let domains = self.domains()?;
        let width: usize = domains.iter().map(|d| d.categories.len()).sum();
        let mut matrix = FeatureMatrix::new(self.feature_names_out()?);

        for row in rows {
            check_width(domains.len(), row.len())?;

            let mut encoded = vec![0.0; width];
            let mut offset = 0;
            for (domain, &value) in domains.iter().zip(row) {
                match domain.position(value) {
                    Some(idx) => encoded[offset + idx] = 1.0,
                    None => match self.policy {
                        UnknownCategoryPolicy::Error => {
                            return Err(PipelineError::UnknownCategory {
                                feature: domain.feature.clone(),
                                value: value.unwrap_or(MISSING_CATEGORY).to_string(),
                            });
                        }
                        UnknownCategoryPolicy::Ignore => {
                            debug!(
                                feature = %domain.feature,
                                value = ?value,
                                "Unseen category encoded as zeros"
                            );
                        }
                    },
                }
                offset += domain.categories.len();
            }
            matrix.push_row(encoded)?;
        }

        Ok(matrix)
    }

    /// Output column names in fit order
    pub fn feature_names_out(&self) -> Result<Vec<String>> {
        Ok(self
            .domains()?
            .iter()
            .flat_map(|d| d.column_names())
            .collect())
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, EncoderState::Fitted(_))
    }

    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    /// Apply the configured policy to an encoder loaded from disk
    pub fn set_policy(&mut self, policy: UnknownCategoryPolicy) {
        self.policy = policy;
    }

    fn domains(&self) -> Result<&[CategoryDomain]> {
        match &self.state {
            EncoderState::Fitted(domains) => Ok(domains),
            EncoderState::Unfitted => Err(PipelineError::EncoderNotFitted),
        }
    }
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new(UnknownCategoryPolicy::default())
    }
}

fn check_width(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(PipelineError::InvalidInput(format!(
            "expected {expected} categorical values, got {actual}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: [&str; 2] = ["card4", "m1"];

    fn training_rows() -> Vec<Vec<Option<&'static str>>> {
        vec![
            vec![Some("visa"), Some("T")],
            vec![Some("mastercard"), None],
            vec![Some("visa"), Some("F")],
        ]
    }

    fn fitted(policy: UnknownCategoryPolicy) -> OneHotEncoder {
        let mut encoder = OneHotEncoder::new(policy);
        encoder.fit(&FEATURES, &training_rows()).unwrap();
        encoder
    }

    #[test]
    fn test_feature_names_are_sorted_with_missing_last() {
        let encoder = fitted(UnknownCategoryPolicy::Error);
        assert_eq!(
            encoder.feature_names_out().unwrap(),
            vec![
                "card4_mastercard",
                "card4_visa",
                "m1_F",
                "m1_T",
                "m1_None"
            ]
        );
    }

    #[test]
    fn test_transform_sets_indicators() {
        let encoder = fitted(UnknownCategoryPolicy::Error);
        let matrix = encoder
            .transform(&[vec![Some("visa"), None]])
            .unwrap();
        assert_eq!(matrix.rows()[0], vec![0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unfitted_encoder_fails() {
        let encoder = OneHotEncoder::default();
        assert!(!encoder.is_fitted());
        assert!(matches!(
            encoder.transform(&[vec![Some("visa"), Some("T")]]),
            Err(PipelineError::EncoderNotFitted)
        ));
    }

    #[test]
    fn test_unknown_category_error_policy() {
        let encoder = fitted(UnknownCategoryPolicy::Error);
        let result = encoder.transform(&[vec![Some("discover"), Some("T")]]);
        match result {
            Err(PipelineError::UnknownCategory { feature, value }) => {
                assert_eq!(feature, "card4");
                assert_eq!(value, "discover");
            }
            other => panic!("expected UnknownCategory, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_category_ignore_policy_keeps_width() {
        let encoder = fitted(UnknownCategoryPolicy::Ignore);
        let matrix = encoder
            .transform(&[vec![Some("discover"), Some("T")]])
            .unwrap();
        assert_eq!(matrix.n_cols(), 5);
        assert_eq!(matrix.rows()[0], vec![0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_refit_is_idempotent() {
        let mut encoder = fitted(UnknownCategoryPolicy::Error);
        let before = encoder.state().clone();
        encoder.fit(&FEATURES, &training_rows()).unwrap();
        assert_eq!(encoder.state(), &before);
    }
}
