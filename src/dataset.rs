//! Historical transaction loading

use crate::error::Result;
use crate::types::TransactionEvent;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Read entity rows (`transactionid`, `event_timestamp`, `isfraud`) from a CSV file.
/// Other columns in the file are ignored.
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<TransactionEvent>> {
    let path = path.as_ref();
    let events = read_transactions(std::fs::File::open(path)?)?;

    let fraud = events.iter().filter(|e| e.isfraud).count();
    info!(
        path = %path.display(),
        transactions = events.len(),
        fraudulent = fraud,
        "Loaded historical transactions"
    );
    Ok(events)
}

/// Read entity rows from any CSV source
pub fn read_transactions<R: Read>(source: R) -> Result<Vec<TransactionEvent>> {
    let mut reader = csv::Reader::from_reader(source);
    let mut events = Vec::new();
    for record in reader.deserialize() {
        events.push(record?);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_extra_columns_are_ignored() {
        let data = "transactionid,isfraud,transactionamt,event_timestamp\n\
                    10,0,30.95,2024-03-01T12:00:00Z\n\
                    11,1,99.00,2024-03-01T13:00:00+00:00\n";
        let events = read_transactions(data.as_bytes()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].transactionid, 10);
        assert!(!events[0].isfraud);
        assert!(events[1].isfraud);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_transactions("no/such/file.csv"),
            Err(PipelineError::Io(_))
        ));
    }

    #[test]
    fn test_bad_label() {
        let data = "transactionid,event_timestamp,isfraud\n1,2024-03-01T12:00:00Z,maybe\n";
        assert!(matches!(
            read_transactions(data.as_bytes()),
            Err(PipelineError::Csv(_))
        ));
    }
}
