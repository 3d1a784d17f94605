//! Synthetic Dataset Generator
//!
//! Writes a labelled transactions file and the matching feature source table
//! so the classifier can be trained without the production data.
//!
//! Usage: generate-dataset [output_dir] [count] [fraud_rate] [seed]

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Transaction id of the example request scored by the classifier
const EXAMPLE_TRANSACTION_ID: i64 = 3577537;

const FIRST_TRANSACTION_ID: i64 = 2987000;

/// One row of the labelled transactions file
#[derive(Debug, Serialize)]
struct TransactionRow {
    transactionid: i64,
    event_timestamp: String,
    isfraud: u8,
}

/// One row of the feature source table
#[derive(Debug, Serialize)]
struct FeatureRow {
    transactionid: i64,
    event_timestamp: String,
    created_timestamp: String,
    productcd: String,
    transactionamt: Option<f64>,
    p_emaildomain: Option<String>,
    r_emaildomain: Option<String>,
    card4: Option<String>,
    m1: Option<String>,
    m2: Option<String>,
    m3: Option<String>,
}

/// Transaction generator with a reproducible random source
struct TransactionGenerator {
    rng: StdRng,
    start: DateTime<Utc>,
}

impl TransactionGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }

    fn timestamp(&mut self) -> DateTime<Utc> {
        self.start + Duration::seconds(self.rng.gen_range(0..90 * 24 * 3600))
    }

    /// Feature row for a legitimate transaction
    fn legitimate(&mut self, transactionid: i64, at: DateTime<Utc>) -> FeatureRow {
        let p_email = self.optional(&["gmail.com", "yahoo.com", "hotmail.com", "outlook.com"], 0.05);
        FeatureRow {
            transactionid,
            event_timestamp: at.to_rfc3339(),
            created_timestamp: at.to_rfc3339(),
            productcd: self.random_choice(&["W", "W", "W", "H", "R", "S"]).to_string(),
            transactionamt: Some(round_cents(self.rng.gen_range(5.0..300.0))),
            r_emaildomain: if self.rng.gen_bool(0.3) { p_email.clone() } else { None },
            p_emaildomain: p_email,
            card4: self.optional(&["visa", "visa", "mastercard", "american express"], 0.01),
            m1: self.optional(&["T", "T", "T", "F"], 0.3),
            m2: self.optional(&["T", "T", "F"], 0.3),
            m3: self.optional(&["T", "F", "F"], 0.3),
        }
    }

    /// Feature row for a fraudulent transaction
    fn fraudulent(&mut self, transactionid: i64, at: DateTime<Utc>) -> FeatureRow {
        let p_email = self.optional(&["anonymous.com", "protonmail.com", "gmail.com"], 0.2);
        FeatureRow {
            transactionid,
            event_timestamp: at.to_rfc3339(),
            created_timestamp: at.to_rfc3339(),
            productcd: self.random_choice(&["C", "C", "W"]).to_string(),
            transactionamt: Some(round_cents(self.rng.gen_range(200.0..3000.0))),
            r_emaildomain: p_email.clone(),
            p_emaildomain: p_email,
            card4: self.optional(&["discover", "visa", "mastercard"], 0.1),
            m1: self.optional(&["F"], 0.6),
            m2: self.optional(&["F"], 0.6),
            m3: self.optional(&["F"], 0.6),
        }
    }

    /// The example request's stored features
    fn example(at: DateTime<Utc>) -> FeatureRow {
        FeatureRow {
            transactionid: EXAMPLE_TRANSACTION_ID,
            event_timestamp: at.to_rfc3339(),
            created_timestamp: at.to_rfc3339(),
            productcd: "W".to_string(),
            transactionamt: Some(30.95),
            p_emaildomain: Some("gmail.com".to_string()),
            r_emaildomain: None,
            card4: Some("mastercard".to_string()),
            m1: Some("T".to_string()),
            m2: Some("F".to_string()),
            m3: Some("F".to_string()),
        }
    }

    /// Pick a value, or none with probability `missing`
    fn optional(&mut self, choices: &[&str], missing: f64) -> Option<String> {
        if self.rng.gen_bool(missing) {
            None
        } else {
            Some(self.random_choice(choices).to_string())
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Generated ids must stay below the example id
fn validate_args(count: i64, fraud_rate: f64) -> Result<()> {
    let max_count = EXAMPLE_TRANSACTION_ID - FIRST_TRANSACTION_ID;
    if !(0..=max_count).contains(&count) {
        anyhow::bail!("count must be within [0, {max_count}], got {count}");
    }
    if !(0.0..=1.0).contains(&fraud_rate) {
        anyhow::bail!("fraud_rate must be within [0, 1], got {fraud_rate}");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_dataset=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let output_dir = args.get(1).map(|s| s.as_str()).unwrap_or("data");
    let count: i64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(2000);
    let fraud_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let seed: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(42);

    validate_args(count, fraud_rate)?;

    info!(
        output_dir = %output_dir,
        count = count,
        fraud_rate = fraud_rate,
        seed = seed,
        "Configuration loaded"
    );

    let dir = Path::new(output_dir);
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {output_dir}"))?;

    let mut transactions = csv::Writer::from_path(dir.join("train_transaction.csv"))?;
    let mut features = csv::Writer::from_path(dir.join("transaction_features.csv"))?;
    let mut generator = TransactionGenerator::new(seed);

    let mut fraudulent_count = 0;
    for offset in 0..count {
        let transactionid = FIRST_TRANSACTION_ID + offset;
        let at = generator.timestamp();
        let is_fraud = generator.rng.gen_bool(fraud_rate);

        let row = if is_fraud {
            fraudulent_count += 1;
            generator.fraudulent(transactionid, at)
        } else {
            generator.legitimate(transactionid, at)
        };

        features.serialize(&row)?;
        transactions.serialize(TransactionRow {
            transactionid,
            // Labels are observed a little after the features are written
            event_timestamp: (at + Duration::minutes(5)).to_rfc3339(),
            isfraud: u8::from(is_fraud),
        })?;
    }

    // The example request is served from the online store but never trained on
    let at = generator.timestamp();
    features.serialize(TransactionGenerator::example(at))?;

    transactions.flush()?;
    features.flush()?;

    info!(
        "Completed! Wrote {} transactions ({} legitimate, {} fraudulent) to {}",
        count,
        count - fraudulent_count,
        fraudulent_count,
        output_dir
    );

    Ok(())
}
