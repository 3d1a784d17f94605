//! Feature store access
//!
//! [`FeatureStore`] is the seam between the pipeline and whatever serves
//! features. [`FileFeatureStore`] backs both retrieval paths with a CSV
//! rendering of the batch source table: historical retrieval performs a
//! point-in-time join, online retrieval returns the latest row per entity.

use crate::error::{PipelineError, Result};
use crate::features::schema::{FeatureRef, FeatureRow, FeatureValue, FeatureView};
use crate::types::TransactionEvent;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Entity key plus the timestamp features must be joined as-of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRow {
    pub entity_id: i64,
    pub event_timestamp: DateTime<Utc>,
}

impl From<&TransactionEvent> for EntityRow {
    fn from(event: &TransactionEvent) -> Self {
        Self {
            entity_id: event.transactionid,
            event_timestamp: event.event_timestamp,
        }
    }
}

/// Source of historical and online feature values
pub trait FeatureStore {
    /// Point-in-time correct values for each entity row, in input order
    fn get_historical_features(
        &self,
        entity_rows: &[EntityRow],
        features: &[FeatureRef],
    ) -> Result<Vec<FeatureRow>>;

    /// Latest values for each entity id, in input order
    fn get_online_features(
        &self,
        entity_ids: &[i64],
        features: &[FeatureRef],
    ) -> Result<Vec<FeatureRow>>;
}

/// One row of the batch source table
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub entity_id: i64,
    pub event_timestamp: DateTime<Utc>,
    pub created_timestamp: Option<DateTime<Utc>>,
    pub values: BTreeMap<String, FeatureValue>,
}

/// Feature store over a single feature view loaded into memory
pub struct FileFeatureStore {
    view: FeatureView,
    /// Rows per entity, ascending by (event, created) timestamp
    rows: HashMap<i64, Vec<SourceRow>>,
}

impl FileFeatureStore {
    /// Build a store from already parsed source rows
    pub fn from_rows(view: FeatureView, source_rows: Vec<SourceRow>) -> Self {
        let mut rows: HashMap<i64, Vec<SourceRow>> = HashMap::new();
        for row in source_rows {
            rows.entry(row.entity_id).or_default().push(row);
        }
        for entity_rows in rows.values_mut() {
            entity_rows.sort_by_key(|r| (r.event_timestamp, r.created_timestamp));
        }

        Self { view, rows }
    }

    /// Load the batch source table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(view: FeatureView, path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let column = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                PipelineError::InvalidInput(format!(
                    "{} is missing column {name}",
                    path.display()
                ))
            })
        };

        let entity = view.entities.first().ok_or_else(|| {
            PipelineError::InvalidInput(format!("feature view {} has no entity", view.name))
        })?;
        let entity_col = column(entity)?;
        let event_col = column(&view.batch_source.event_timestamp_column)?;
        let created_col = headers
            .iter()
            .position(|h| h == view.batch_source.created_timestamp_column);
        let feature_cols = view
            .features
            .iter()
            .map(|f| column(&f.name).map(|idx| (f, idx)))
            .collect::<Result<Vec<_>>>()?;

        let mut source_rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let entity_id = field(entity_col).trim().parse::<i64>().map_err(|_| {
                PipelineError::InvalidInput(format!(
                    "row {}: invalid entity id {:?}",
                    line + 1,
                    field(entity_col)
                ))
            })?;
            let event_timestamp = parse_timestamp(field(event_col))?.ok_or_else(|| {
                PipelineError::InvalidInput(format!("row {}: missing event timestamp", line + 1))
            })?;
            let created_timestamp = match created_col {
                Some(idx) => parse_timestamp(field(idx))?,
                None => None,
            };

            let mut values = BTreeMap::new();
            for (feature, idx) in &feature_cols {
                values.insert(
                    feature.name.clone(),
                    FeatureValue::parse(field(*idx), feature.dtype)?,
                );
            }

            source_rows.push(SourceRow {
                entity_id,
                event_timestamp,
                created_timestamp,
                values,
            });
        }

        info!(
            path = %path.display(),
            view = %view.name,
            rows = source_rows.len(),
            "Loaded feature source"
        );

        Ok(Self::from_rows(view, source_rows))
    }

    /// Number of distinct entities with at least one row
    pub fn entity_count(&self) -> usize {
        self.rows.len()
    }

    pub fn view(&self) -> &FeatureView {
        &self.view
    }

    /// Resolve requested references to feature names of this view
    fn resolve(&self, features: &[FeatureRef]) -> Result<Vec<String>> {
        features
            .iter()
            .map(|r| {
                if r.view == self.view.name && self.view.feature(&r.feature).is_some() {
                    Ok(r.feature.clone())
                } else {
                    Err(PipelineError::UnknownFeature(r.to_string()))
                }
            })
            .collect()
    }

    fn project(entity_id: i64, row: Option<&SourceRow>, names: &[String]) -> FeatureRow {
        let values = names
            .iter()
            .map(|name| {
                let value = row
                    .and_then(|r| r.values.get(name))
                    .cloned()
                    .unwrap_or(FeatureValue::Null);
                (name.clone(), value)
            })
            .collect();

        FeatureRow { entity_id, values }
    }
}

impl FeatureStore for FileFeatureStore {
    fn get_historical_features(
        &self,
        entity_rows: &[EntityRow],
        features: &[FeatureRef],
    ) -> Result<Vec<FeatureRow>> {
        let names = self.resolve(features)?;
        let ttl = self.view.ttl;
        let mut misses = 0usize;

        let rows = entity_rows
            .iter()
            .map(|entity| {
                let matched = self.rows.get(&entity.entity_id).and_then(|candidates| {
                    candidates.iter().rev().find(|r| {
                        r.event_timestamp <= entity.event_timestamp
                            && entity.event_timestamp - r.event_timestamp <= ttl
                    })
                });
                if matched.is_none() {
                    misses += 1;
                }
                Self::project(entity.entity_id, matched, &names)
            })
            .collect();

        debug!(
            entities = entity_rows.len(),
            features = names.len(),
            misses,
            "Historical feature retrieval complete"
        );

        Ok(rows)
    }

    fn get_online_features(
        &self,
        entity_ids: &[i64],
        features: &[FeatureRef],
    ) -> Result<Vec<FeatureRow>> {
        let names = self.resolve(features)?;

        Ok(entity_ids
            .iter()
            .map(|id| {
                let latest = self.rows.get(id).and_then(|rows| rows.last());
                Self::project(*id, latest, &names)
            })
            .collect())
    }
}

fn parse_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| PipelineError::InvalidInput(format!("invalid timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::schema::transaction_features;
    use chrono::TimeZone;
    use std::io::Write;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn source_row(id: i64, day: u32, card: &str) -> SourceRow {
        let mut values = BTreeMap::new();
        values.insert("card4".to_string(), FeatureValue::String(card.to_string()));
        values.insert("transactionamt".to_string(), FeatureValue::Double(10.0));
        SourceRow {
            entity_id: id,
            event_timestamp: ts(day),
            created_timestamp: None,
            values,
        }
    }

    fn card_ref() -> Vec<FeatureRef> {
        vec!["transaction_features:card4".parse().unwrap()]
    }

    #[test]
    fn test_historical_join_is_point_in_time() {
        let store = FileFeatureStore::from_rows(
            transaction_features(),
            vec![source_row(1, 5, "visa"), source_row(1, 10, "mastercard")],
        );

        let rows = store
            .get_historical_features(
                &[
                    EntityRow { entity_id: 1, event_timestamp: ts(7) },
                    EntityRow { entity_id: 1, event_timestamp: ts(12) },
                    EntityRow { entity_id: 1, event_timestamp: ts(2) },
                ],
                &card_ref(),
            )
            .unwrap();

        assert_eq!(rows[0].get("card4").as_str(), Some("visa"));
        assert_eq!(rows[1].get("card4").as_str(), Some("mastercard"));
        assert!(rows[2].get("card4").is_null());
    }

    #[test]
    fn test_historical_join_respects_ttl() {
        let mut view = transaction_features();
        view.ttl = chrono::Duration::days(3);
        let store = FileFeatureStore::from_rows(view, vec![source_row(1, 1, "visa")]);

        let rows = store
            .get_historical_features(
                &[
                    EntityRow { entity_id: 1, event_timestamp: ts(3) },
                    EntityRow { entity_id: 1, event_timestamp: ts(9) },
                ],
                &card_ref(),
            )
            .unwrap();

        assert_eq!(rows[0].get("card4").as_str(), Some("visa"));
        assert!(rows[1].get("card4").is_null());
    }

    #[test]
    fn test_historical_tie_breaks_on_created_timestamp() {
        let mut first = source_row(1, 5, "visa");
        first.created_timestamp = Some(ts(6));
        let mut second = source_row(1, 5, "mastercard");
        second.created_timestamp = Some(ts(5));
        let store = FileFeatureStore::from_rows(transaction_features(), vec![first, second]);

        let rows = store
            .get_historical_features(
                &[EntityRow { entity_id: 1, event_timestamp: ts(7) }],
                &card_ref(),
            )
            .unwrap();
        assert_eq!(rows[0].get("card4").as_str(), Some("visa"));
    }

    #[test]
    fn test_online_returns_latest() {
        let store = FileFeatureStore::from_rows(
            transaction_features(),
            vec![source_row(1, 10, "mastercard"), source_row(1, 5, "visa")],
        );

        let rows = store.get_online_features(&[1, 2], &card_ref()).unwrap();
        assert_eq!(rows[0].get("card4").as_str(), Some("mastercard"));
        assert_eq!(rows[1].entity_id, 2);
        assert!(rows[1].get("card4").is_null());
    }

    #[test]
    fn test_unknown_feature_is_rejected() {
        let store = FileFeatureStore::from_rows(transaction_features(), Vec::new());
        let refs = vec!["transaction_features:card5".parse().unwrap()];
        assert!(matches!(
            store.get_online_features(&[1], &refs),
            Err(PipelineError::UnknownFeature(_))
        ));
    }

    #[test]
    fn test_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "transactionid,event_timestamp,created_timestamp,productcd,transactionamt,p_emaildomain,r_emaildomain,card4,m1,m2,m3\n\
             7,2024-01-01T00:00:00Z,2024-01-01T00:00:00Z,W,30.95,gmail.com,,visa,T,F,F\n\
             7,2024-01-01T00:00:00Z,2024-01-02T00:00:00Z,W,31.50,gmail.com,,visa,T,F,F"
        )
        .unwrap();

        let store = FileFeatureStore::from_csv(transaction_features(), file.path()).unwrap();
        assert_eq!(store.entity_count(), 1);

        let refs = store.view().feature_refs();
        let rows = store.get_online_features(&[7], &refs).unwrap();
        // Same event timestamp: the later created row wins
        assert_eq!(rows[0].get("transactionamt").as_f64(), Some(31.5));
        assert!(rows[0].get("r_emaildomain").is_null());
    }

    #[test]
    fn test_from_csv_missing_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "transactionid,event_timestamp\n1,2024-01-01T00:00:00Z").unwrap();

        assert!(matches!(
            FileFeatureStore::from_csv(transaction_features(), file.path()),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
