//! Stage timings and run statistics for the fraud classifier.

use crate::models::classifier::FitSummary;
use crate::types::Label;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Named pipeline stages
pub mod stage {
    pub const HISTORICAL_FEATURES: &str = "historical_features";
    pub const ENCODER_FIT: &str = "encoder_fit";
    pub const CLASSIFIER_FIT: &str = "classifier_fit";
    pub const ONLINE_FEATURES: &str = "online_features";
    pub const PREDICT: &str = "predict";
}

/// Metrics collector for one process run
pub struct PipelineMetrics {
    /// Predictions served
    pub predictions: AtomicU64,
    /// Predictions labelled fraudulent
    pub fraud_predictions: AtomicU64,
    /// Stage durations (in microseconds)
    stage_times: RwLock<BTreeMap<&'static str, Vec<u64>>>,
    /// Summary of the last fit performed in this run
    training: RwLock<Option<FitSummary>>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            fraud_predictions: AtomicU64::new(0),
            stage_times: RwLock::new(BTreeMap::new()),
            training: RwLock::new(None),
            start_time: Instant::now(),
        }
    }

    /// Record how long a stage took
    pub fn record_stage(&self, stage: &'static str, duration: Duration) {
        if let Ok(mut times) = self.stage_times.write() {
            times
                .entry(stage)
                .or_default()
                .push(duration.as_micros() as u64);
        }
    }

    /// Run `f`, recording its duration under `stage`
    pub fn time<T>(&self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.record_stage(stage, start.elapsed());
        result
    }

    pub fn record_prediction(&self, label: Label) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if label == Label::Fraudulent {
            self.fraud_predictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_training(&self, summary: &FitSummary) {
        if let Ok(mut training) = self.training.write() {
            *training = Some(summary.clone());
        }
    }

    /// Total microseconds spent in a stage
    pub fn stage_total_us(&self, stage: &str) -> u64 {
        self.stage_times
            .read()
            .ok()
            .and_then(|times| times.get(stage).map(|t| t.iter().sum()))
            .unwrap_or(0)
    }

    pub fn training_summary(&self) -> Option<FitSummary> {
        self.training.read().ok().and_then(|t| t.clone())
    }

    /// Log a summary of the run
    pub fn print_summary(&self) {
        info!(
            elapsed_ms = self.start_time.elapsed().as_millis() as u64,
            predictions = self.predictions.load(Ordering::Relaxed),
            fraudulent = self.fraud_predictions.load(Ordering::Relaxed),
            "Run summary"
        );

        if let Some(summary) = self.training_summary() {
            info!(
                rows = summary.rows,
                fraud_rate = format!("{:.3}", summary.fraud_rate),
                train_accuracy = format!("{:.3}", summary.train_accuracy),
                "Training summary"
            );
        }

        if let Ok(times) = self.stage_times.read() {
            for (stage, samples) in times.iter() {
                let total: u64 = samples.iter().sum();
                info!(stage = %stage, calls = samples.len(), total_us = total, "Stage timing");
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_counts() {
        let metrics = PipelineMetrics::new();
        metrics.record_prediction(Label::Legitimate);
        metrics.record_prediction(Label::Fraudulent);

        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.fraud_predictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stage_timing() {
        let metrics = PipelineMetrics::new();
        metrics.record_stage(stage::PREDICT, Duration::from_micros(100));
        let value = metrics.time(stage::PREDICT, || 7);

        assert_eq!(value, 7);
        assert!(metrics.stage_total_us(stage::PREDICT) >= 100);
        assert_eq!(metrics.stage_total_us(stage::ENCODER_FIT), 0);
    }

    #[test]
    fn test_training_summary() {
        let metrics = PipelineMetrics::new();
        assert!(metrics.training_summary().is_none());

        metrics.record_training(&FitSummary {
            rows: 10,
            fraud_rate: 0.1,
            train_accuracy: 0.9,
        });
        assert_eq!(metrics.training_summary().unwrap().rows, 10);
    }
}
