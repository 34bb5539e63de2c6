//! Model training module
//!
//! Provides the classifier used by the churn pipeline:
//! - CART decision trees with weighted Gini impurity
//! - Random Forests of bootstrapped trees with balanced class weights
//! - Stratified train/test splitting
//! - The training stage that fits and persists the pipeline

pub mod decision_tree;
pub mod random_forest;
pub mod split;
mod trainer;

pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::{split_data, StratifiedSplitter, TrainTestSplit};
pub use trainer::{train_model, Trainer, TrainingSummary};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Common interface for probabilistic classifiers
pub trait Classifier: Send + Sync {
    /// Fit the model
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Class probabilities, one column per entry of `classes()`
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Sorted class labels seen during fit
    fn classes(&self) -> &[i64];

    /// Most probable class per row. Equal probabilities resolve to the
    /// larger label, so a binary model predicts 1 iff P(1) >= 0.5.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let proba = self.predict_proba(x)?;
        Ok(labels_from_proba(&proba, self.classes()))
    }
}

/// Arg-max label per row; the later class wins a tie
pub(crate) fn labels_from_proba(proba: &Array2<f64>, classes: &[i64]) -> Array1<i64> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (j, &p) in row.iter().enumerate() {
                if p >= row[best] {
                    best = j;
                }
            }
            classes[best]
        })
        .collect()
}

/// Class weighting applied to training samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// Every sample counts once
    #[default]
    None,
    /// `n_samples / (n_classes * class_count)`
    Balanced,
}

/// Sorted unique labels and, for each row, the position of its label
pub(crate) fn encode_classes(y: &Array1<i64>) -> (Vec<i64>, Vec<usize>) {
    let mut classes: Vec<i64> = y.to_vec();
    classes.sort_unstable();
    classes.dedup();

    let encoded = y
        .iter()
        .map(|label| classes.binary_search(label).unwrap_or_default())
        .collect();

    (classes, encoded)
}
