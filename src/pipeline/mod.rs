//! Fitted churn pipeline
//!
//! A pipeline is an ordered list of named stages sharing one contract: during
//! fitting every stage learns from the output of the previous one, during
//! inference every stage that is not training-only transforms the rows and
//! the final classifier scores them.

use crate::config::TrainingConfig;
use crate::error::{ChurnError, Result};
use crate::preprocessing::{StandardScaler, Transformer};
use crate::synthetic::{Sampler, Smote};
use crate::training::{labels_from_proba, Classifier, RandomForest};
use crate::utils::feature_matrix;
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single pipeline step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stage {
    Scaler(StandardScaler),
    Resampler(Smote),
    Classifier(RandomForest),
}

impl Stage {
    /// Stages that only run while fitting
    pub fn is_training_only(&self) -> bool {
        matches!(self, Stage::Resampler(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Stage::Scaler(_) => "scaler",
            Stage::Resampler(_) => "resampler",
            Stage::Classifier(_) => "classifier",
        }
    }

    /// Learn from `(x, y)` and return the data handed to the next stage
    fn fit(&mut self, x: Array2<f64>, y: Array1<i64>) -> Result<(Array2<f64>, Array1<i64>, usize)> {
        match self {
            Stage::Scaler(scaler) => {
                let scaled = scaler.fit_transform(&x)?;
                Ok((scaled, y, 0))
            }
            Stage::Resampler(smote) => {
                let result = smote.fit_resample(&x, &y)?;
                let generated = result.total_synthetic();
                Ok((result.x, result.y, generated))
            }
            Stage::Classifier(model) => {
                model.fit(&x, &y)?;
                Ok((x, y, 0))
            }
        }
    }

    /// Inference-time transform; classifiers pass rows through unchanged
    fn apply(&self, x: Array2<f64>) -> Result<Array2<f64>> {
        match self {
            Stage::Scaler(scaler) => scaler.transform(&x),
            Stage::Resampler(_) | Stage::Classifier(_) => Ok(x),
        }
    }
}

/// A stage with its name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedStage {
    pub name: String,
    pub stage: Stage,
}

impl NamedStage {
    pub fn new(name: impl Into<String>, stage: Stage) -> Self {
        Self {
            name: name.into(),
            stage,
        }
    }
}

/// Outcome of fitting a pipeline
#[derive(Debug, Clone, Default)]
pub struct FitReport {
    /// Rows the pipeline was fit on, before resampling
    pub n_rows: usize,
    /// Synthetic rows created by training-only stages
    pub n_synthetic: usize,
}

/// scaler → smote → random forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnPipeline {
    /// Feature columns in fitted order
    feature_names: Vec<String>,
    /// Label column name
    target: String,
    stages: Vec<NamedStage>,
    fitted: bool,
}

impl ChurnPipeline {
    /// Build an unfitted pipeline from explicit stages
    pub fn new(stages: Vec<NamedStage>) -> Self {
        Self {
            feature_names: Vec::new(),
            target: "Churn".to_string(),
            stages,
            fitted: false,
        }
    }

    /// The standard pipeline configured from training settings
    pub fn from_config(config: &TrainingConfig) -> Self {
        let forest = RandomForest::new(config.n_estimators)
            .with_max_depth(config.max_depth)
            .with_min_samples_split(config.min_samples_split)
            .with_min_samples_leaf(config.min_samples_leaf)
            .with_max_features(config.max_features)
            .with_class_weight(config.class_weight)
            .with_bootstrap(config.bootstrap)
            .with_random_state(config.random_state);

        let smote = Smote::new()
            .with_k_neighbors(config.k_neighbors)
            .with_seed(config.random_state);

        Self::new(vec![
            NamedStage::new("scaler", Stage::Scaler(StandardScaler::new())),
            NamedStage::new("smote", Stage::Resampler(smote)),
            NamedStage::new("model", Stage::Classifier(forest)),
        ])
        .with_target(config.target_column.clone())
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Fit every stage in order on the training rows
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, feature_names: &[String]) -> Result<FitReport> {
        if feature_names.len() != x.ncols() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} feature names", x.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        if !matches!(self.stages.last(), Some(NamedStage { stage: Stage::Classifier(_), .. })) {
            return Err(ChurnError::TrainingError(
                "the last pipeline stage must be a classifier".to_string(),
            ));
        }

        let mut report = FitReport {
            n_rows: x.nrows(),
            n_synthetic: 0,
        };
        let mut data = (x.clone(), y.clone());

        for named in &mut self.stages {
            let (next_x, next_y, generated) = named.stage.fit(data.0, data.1)?;
            debug!(stage = %named.name, kind = named.stage.kind(), rows = next_x.nrows(), "Stage fitted");
            report.n_synthetic += generated;
            data = (next_x, next_y);
        }

        self.feature_names = feature_names.to_vec();
        self.fitted = true;
        Ok(report)
    }

    fn classifier(&self) -> Result<&RandomForest> {
        match self.stages.last() {
            Some(NamedStage { stage: Stage::Classifier(model), .. }) => Ok(model),
            _ => Err(ChurnError::ModelNotFitted),
        }
    }

    /// Run the inference stages, skipping training-only ones
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        if x.ncols() != self.feature_names.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.feature_names.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        self.stages
            .iter()
            .filter(|named| !named.stage.is_training_only())
            .try_fold(x.clone(), |acc, named| named.stage.apply(acc))
    }

    /// Class probabilities, one column per class in label order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let transformed = self.transform(x)?;
        self.classifier()?.predict_proba(&transformed)
    }

    /// Predicted class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let transformed = self.transform(x)?;
        self.classifier()?.predict(&transformed)
    }

    /// Probability of the positive (largest) class for every row
    pub fn positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let last = proba.ncols().checked_sub(1).ok_or(ChurnError::ModelNotFitted)?;
        Ok(proba.column(last).to_owned())
    }

    /// Labels and positive-class probabilities from a single scoring pass
    pub fn predict_with_proba(&self, x: &Array2<f64>) -> Result<(Array1<i64>, Array1<f64>)> {
        let transformed = self.transform(x)?;
        let model = self.classifier()?;
        let proba = model.predict_proba(&transformed)?;
        let labels = labels_from_proba(&proba, model.classes());
        let last = proba.ncols().saturating_sub(1);
        Ok((labels, proba.column(last).to_owned()))
    }

    /// Select the fitted feature columns by name from a frame
    pub fn features_from_frame(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        feature_matrix(df, &self.feature_names)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn stages(&self) -> &[NamedStage] {
        &self.stages
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Forest feature importances paired with their column names, largest first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let Ok(model) = self.classifier() else {
            return Vec::new();
        };
        let Some(importances) = model.feature_importances() else {
            return Vec::new();
        };

        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}
