//! Model evaluation
//!
//! Scores a labelled dataset with a fitted pipeline and reports per-class
//! precision/recall/F1 together with ROC-AUC.

mod metrics;

pub use metrics::{roc_auc_score, ClassMetrics, ClassificationReport};

use crate::error::{ChurnError, Result};
use crate::pipeline::ChurnPipeline;
use ndarray::{Array1, Array2};
use tracing::info;

/// Predictions and metrics for one labelled dataset
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub predictions: Array1<i64>,
    /// Positive-class probabilities
    pub probabilities: Array1<f64>,
    pub report: ClassificationReport,
    pub roc_auc: f64,
}

impl Evaluation {
    /// `(predictions, probabilities)` for reuse by the caller
    pub fn into_parts(self) -> (Array1<i64>, Array1<f64>) {
        (self.predictions, self.probabilities)
    }
}

/// Score `x`, print the classification report and ROC-AUC, return both vectors
pub fn evaluate_model(pipeline: &ChurnPipeline, x: &Array2<f64>, y: &Array1<i64>) -> Result<Evaluation> {
    if x.nrows() != y.len() {
        return Err(ChurnError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }

    let (predictions, probabilities) = pipeline.predict_with_proba(x)?;
    let report = ClassificationReport::new(y, &predictions)?;
    let roc_auc = roc_auc_score(y, &probabilities)?;

    println!("{}", report);
    println!("ROC-AUC: {:.3}", roc_auc);
    info!(rows = y.len(), accuracy = report.accuracy, roc_auc, "Evaluation complete");

    Ok(Evaluation {
        predictions,
        probabilities,
        report,
        roc_auc,
    })
}
