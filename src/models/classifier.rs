//! Gradient-boosted tree classifier

use crate::config::ClassifierConfig;
use crate::error::{PipelineError, Result};
use crate::types::{FeatureMatrix, Label};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::xgboost::{XGRegressor, XGRegressorParameters};
use tracing::{debug, info};

type Booster = XGRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Summary of the data a model was fit on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub rows: usize,
    pub fraud_rate: f64,
    /// In-sample accuracy at the decision threshold
    pub train_accuracy: f64,
}

/// Fit parameters together with the exact column layout they expect
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    booster: Booster,
    feature_names: Vec<String>,
    threshold: f64,
    summary: FitSummary,
}

impl TrainedModel {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn summary(&self) -> &FitSummary {
        &self.summary
    }
}

/// Untrained until `fit` succeeds or fitted parameters are loaded
#[derive(Debug, Serialize, Deserialize)]
pub enum ClassifierState {
    Untrained,
    Trained(Box<TrainedModel>),
}

/// Binary fraud classifier over an assembled feature matrix
#[derive(Debug, Serialize, Deserialize)]
pub struct FraudClassifier {
    params: ClassifierConfig,
    state: ClassifierState,
}

impl FraudClassifier {
    pub fn new(params: ClassifierConfig) -> Self {
        Self {
            params,
            state: ClassifierState::Untrained,
        }
    }

    /// Fit the ensemble on `x` and labels `y`, replacing any earlier fit
    pub fn fit(&mut self, x: &FeatureMatrix, y: &[Label]) -> Result<()> {
        if x.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot fit classifier on zero rows".to_string(),
            ));
        }
        if x.n_rows() != y.len() {
            return Err(PipelineError::InvalidInput(format!(
                "{} rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }

        let data = to_dense(x)?;
        let targets: Vec<f64> = y.iter().map(|l| f64::from(l.class_id())).collect();
        let fraud_rate = targets.iter().sum::<f64>() / targets.len() as f64;

        let parameters = XGRegressorParameters::default()
            .with_n_estimators(self.params.n_estimators)
            .with_max_depth(self.params.max_depth)
            .with_learning_rate(self.params.learning_rate)
            .with_min_child_weight(self.params.min_child_weight)
            .with_lambda(self.params.lambda)
            .with_subsample(self.params.subsample)
            .with_seed(self.params.seed)
            .with_base_score(fraud_rate);

        info!(
            rows = x.n_rows(),
            columns = x.n_cols(),
            n_estimators = self.params.n_estimators,
            max_depth = self.params.max_depth,
            "Fitting gradient-boosted trees"
        );

        let booster = Booster::fit(&data, &targets, parameters)?;

        let scores = clamp_scores(booster.predict(&data)?);
        let correct = scores
            .iter()
            .zip(y)
            .filter(|(score, label)| Label::from_score(**score, self.params.threshold) == **label)
            .count();
        let summary = FitSummary {
            rows: x.n_rows(),
            fraud_rate,
            train_accuracy: correct as f64 / y.len() as f64,
        };

        info!(
            fraud_rate = summary.fraud_rate,
            train_accuracy = summary.train_accuracy,
            "Classifier trained"
        );

        self.state = ClassifierState::Trained(Box::new(TrainedModel {
            booster,
            feature_names: x.columns().to_vec(),
            threshold: self.params.threshold,
            summary,
        }));
        Ok(())
    }

    /// Fraud scores in `[0, 1]`, one per row
    pub fn score(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let model = self.trained()?;

        if x.columns() != model.feature_names.as_slice() {
            return Err(column_mismatch(&model.feature_names, x.columns()));
        }
        if x.is_empty() {
            return Ok(Vec::new());
        }

        let scores = clamp_scores(model.booster.predict(&to_dense(x)?)?);
        debug!(rows = scores.len(), "Scored feature matrix");
        Ok(scores)
    }

    /// Discrete labels, one per row
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<Label>> {
        let threshold = self.trained()?.threshold;
        Ok(self
            .score(x)?
            .into_iter()
            .map(|s| Label::from_score(s, threshold))
            .collect())
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ClassifierState::Trained(_))
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    fn trained(&self) -> Result<&TrainedModel> {
        match &self.state {
            ClassifierState::Trained(model) => Ok(model),
            ClassifierState::Untrained => Err(PipelineError::ModelNotTrained),
        }
    }
}

fn to_dense(x: &FeatureMatrix) -> Result<DenseMatrix<f64>> {
    Ok(DenseMatrix::from_2d_vec(&x.rows().to_vec())?)
}

fn clamp_scores(raw: Vec<f64>) -> Vec<f64> {
    raw.into_iter().map(|s| s.clamp(0.0, 1.0)).collect()
}

/// Error naming the first column that differs from the fitted layout
fn column_mismatch(expected: &[String], actual: &[String]) -> PipelineError {
    let position = expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .unwrap_or_else(|| expected.len().min(actual.len()));
    let name = |columns: &[String]| {
        columns
            .get(position)
            .cloned()
            .unwrap_or_else(|| "<missing>".to_string())
    };

    PipelineError::FeatureMismatch {
        position,
        expected: name(expected),
        actual: name(actual),
    }
}
