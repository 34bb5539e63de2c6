//! Random Forest classifier

use super::decision_tree::DecisionTree;
use super::{encode_classes, ClassWeight, Classifier};
use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum features per split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Class weighting
    pub class_weight: ClassWeight,
    /// Random state
    pub random_state: u64,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
    /// Sorted class labels
    classes: Vec<i64>,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Resolve to a feature count, never below 1
    pub fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::None,
            random_state: 0,
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set class weighting
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Per-sample weights for the encoded labels
    fn sample_weights(&self, encoded: &[usize], n_classes: usize) -> Vec<f64> {
        match self.class_weight {
            ClassWeight::None => vec![1.0; encoded.len()],
            ClassWeight::Balanced => {
                let mut counts = vec![0usize; n_classes];
                for &c in encoded {
                    counts[c] += 1;
                }
                let n = encoded.len() as f64;
                let per_class: Vec<f64> = counts
                    .iter()
                    .map(|&count| n / (n_classes as f64 * count.max(1) as f64))
                    .collect();
                encoded.iter().map(|&c| per_class[c]).collect()
            }
        }
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total_importances = vec![0.0; self.n_features];

        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (i, &val) in imp.iter().enumerate().take(self.n_features) {
                    total_importances[i] += val;
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        for imp in &mut total_importances {
            *imp /= n_trees;
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total_importances));
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ChurnError::TrainingError("cannot fit a forest on zero rows".to_string()));
        }
        if self.n_estimators == 0 {
            return Err(ChurnError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.n_features = n_features;
        let max_features = self.max_features.resolve(n_features);

        let (classes, encoded) = encode_classes(y);
        let weights = self.sample_weights(&encoded, classes.len());
        self.classes = classes;

        // Trees are independent: each owns a seed derived from the forest seed,
        // and collect keeps tree order, so the result does not depend on scheduling.
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = self.random_state.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(rng.gen());
                tree.max_depth = self.max_depth;

                tree.fit_indexed(x, &encoded, &weights, &self.classes, &sample_indices)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        Ok(())
    }

    /// Mean of the per-tree leaf distributions
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(ChurnError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let per_tree: Vec<Array2<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        // Summed in tree order so results are reproducible bit for bit
        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));
        for tree_proba in &per_tree {
            proba += tree_proba;
        }
        proba /= self.trees.len() as f64;

        Ok(proba)
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> (Array2<f64>, Array1<i64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [0.3, 0.1],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
            [1.3, 1.0],
        ];
        let y = array![0, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_classifier() {
        let (x, y) = two_blobs();

        let mut rf = RandomForest::new(25).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let correct = predictions.iter().zip(y.iter()).filter(|(p, a)| p == a).count();
        assert!(correct >= 7, "Accuracy too low: {}/8", correct);
        assert_eq!(rf.trees.len(), 25);
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let (x, y) = two_blobs();

        let mut rf = RandomForest::new(10)
            .with_random_state(42)
            .with_class_weight(ClassWeight::Balanced);
        rf.fit(&x, &y).unwrap();

        let sums = rf.predict_proba(&x).unwrap().sum_axis(Axis(1));
        for (i, s) in sums.iter().enumerate() {
            assert!((s - 1.0).abs() < 1e-9, "Row {} sum: {}", i, s);
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = two_blobs();

        let mut a = RandomForest::new(15).with_random_state(7);
        let mut b = RandomForest::new(15).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_without_bootstrap_fits_training_rows() {
        let (x, y) = two_blobs();

        let mut rf = RandomForest::new(5)
            .with_bootstrap(false)
            .with_max_features(MaxFeatures::All)
            .with_random_state(3);
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_balanced_weights() {
        let rf = RandomForest::new(1).with_class_weight(ClassWeight::Balanced);
        let weights = rf.sample_weights(&[0, 0, 0, 1], 2);
        // n / (n_classes * count): 4 / 6 and 4 / 2
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[3] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Sqrt.resolve(19), 4);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::Fixed(50).resolve(10), 10);
        assert_eq!(MaxFeatures::All.resolve(7), 7);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let (x, y) = two_blobs();
        let mut rf = RandomForest::new(3);
        rf.fit(&x, &y).unwrap();

        let narrow = array![[0.5]];
        assert!(matches!(rf.predict_proba(&narrow), Err(ChurnError::ShapeError { .. })));
    }
}
