//! Inference on new data and the evaluation run
//!
//! Loads a persisted artifact, encodes raw categories with the mapping
//! learned at training time, selects the fitted feature columns by name, and
//! appends `Churn_Prediction` / `Churn_Probability` to the input rows.

mod results;

pub use results::{
    attach_predictions, display_results, save_results, PREDICTION_COLUMN, PREDICTION_PREVIEW_ROWS,
    PROBABILITY_COLUMN,
};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::evaluation::{evaluate_model, Evaluation};
use crate::export::{load_model, ModelArtifact};
use crate::pipeline::ChurnPipeline;
use crate::training::StratifiedSplitter;
use crate::utils::{load_data, split_features_target};
use ndarray::Array1;
use polars::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// Labels and positive-class probabilities for every row of `df`
pub fn make_predictions(pipeline: &ChurnPipeline, df: &DataFrame) -> Result<(Array1<i64>, Array1<f64>)> {
    let x = pipeline.features_from_frame(df)?;
    pipeline.predict_with_proba(&x)
}

/// Encode string columns with the artifact's persisted mapping
fn encode_with_artifact(artifact: &ModelArtifact, df: DataFrame) -> Result<DataFrame> {
    match &artifact.encoder {
        Some(encoder) => encoder.transform(&df),
        None => Ok(df),
    }
}

/// Score the CSV at `data_path` with the model at `model_path`
pub fn predict_new(data_path: impl AsRef<Path>, model_path: impl AsRef<Path>) -> Result<DataFrame> {
    let artifact = load_model(model_path)?;
    let raw = load_data(data_path)?;
    let df = encode_with_artifact(&artifact, raw)?;

    let (predictions, probabilities) = make_predictions(&artifact.pipeline, &df)?;
    let results = attach_predictions(&df, &predictions, &probabilities)?;

    display_results(&results, PREDICTION_PREVIEW_ROWS)?;
    info!(rows = results.height(), "Predictions complete");
    Ok(results)
}

/// Output of [`run_evaluation`]
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    pub evaluation: Evaluation,
    /// Evaluated feature rows with the prediction columns appended
    pub results: DataFrame,
    /// Whether only the held-out partition was scored
    pub holdout: bool,
}

/// Rows of `df` that the training split held out, in original order
fn holdout_rows(df: &DataFrame, y: &Array1<i64>, config: &PipelineConfig) -> Result<DataFrame> {
    let (_, test) = StratifiedSplitter::new(config.training.test_size)
        .with_random_state(config.training.random_state)
        .split_indices(y)?;

    let mut keep = vec![false; df.height()];
    for idx in test {
        keep[idx] = true;
    }
    let mask = BooleanChunked::from_slice("holdout".into(), &keep);
    Ok(df.filter(&mask)?)
}

/// Load the cleaned data and model, evaluate, preview, and save predictions.
///
/// Without `holdout` every row is scored, including the rows the model was
/// trained on, so the reported metrics are optimistic.
pub fn run_evaluation(config: &PipelineConfig, holdout: bool) -> Result<EvaluationRun> {
    config.validate()?;
    let paths = &config.paths;
    let target = &config.training.target_column;

    let mut df = load_data(&paths.clean_data)?;
    if holdout {
        let (_, y) = split_features_target(&df, target)?;
        df = holdout_rows(&df, &y, config)?;
        info!(rows = df.height(), "Evaluating on the held-out partition");
    } else {
        warn!("Evaluating on the full dataset; rows seen during training inflate the metrics");
    }

    let (features, y) = split_features_target(&df, target)?;
    let artifact = load_model(&paths.model)?;
    let x = artifact.pipeline.features_from_frame(&features)?;

    let evaluation = evaluate_model(&artifact.pipeline, &x, &y)?;
    let mut results = attach_predictions(&features, &evaluation.predictions, &evaluation.probabilities)?;

    display_results(&results, config.preview_rows)?;
    save_results(&mut results, &paths.predictions)?;

    Ok(EvaluationRun {
        evaluation,
        results,
        holdout,
    })
}
