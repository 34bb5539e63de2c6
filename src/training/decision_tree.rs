//! Decision tree classifier (CART, weighted Gini impurity)

use super::Classifier;
use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const PURITY_EPS: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the normalised weighted class distribution
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split; rows with `x[feature] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Training rows reaching a node, as positions into the sample buffer
struct NodeData<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    weights: &'a [f64],
    n_classes: usize,
}

/// Best split found for a node
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features examined per split (None = all)
    pub max_features: Option<usize>,
    /// Seed for the per-node feature shuffle
    pub random_state: u64,
    /// Number of features
    n_features: usize,
    /// Sorted class labels
    classes: Vec<i64>,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: 0,
            n_features: 0,
            classes: Vec::new(),
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set the number of features examined per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit on the rows listed in `sample_indices` (repeats allowed, as in a
    /// bootstrap) with per-row weights. `y` holds class positions into `classes`.
    pub(crate) fn fit_indexed(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        weights: &[f64],
        classes: &[i64],
        sample_indices: &[usize],
    ) -> Result<()> {
        if sample_indices.is_empty() {
            return Err(ChurnError::TrainingError("cannot fit a tree on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        self.classes = classes.to_vec();

        let data = NodeData {
            x,
            y,
            weights,
            n_classes: classes.len(),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut importances = vec![0.0; self.n_features];
        let mut indices = sample_indices.to_vec();

        let root = self.build_tree(&data, &mut indices, 0, &mut rng, &mut importances);
        self.root = Some(root);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn class_weights(&self, data: &NodeData, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; data.n_classes];
        for &i in indices {
            counts[data.y[i]] += data.weights[i];
        }
        counts
    }

    fn build_tree(
        &self,
        data: &NodeData,
        indices: &mut [usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_weights(data, indices);
        let total_weight: f64 = counts.iter().sum();
        let impurity = gini(&counts, total_weight);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= PURITY_EPS;

        if should_stop {
            return leaf(counts, total_weight, n_samples);
        }

        let Some(best) = self.find_best_split(data, indices, &counts, total_weight, rng) else {
            return leaf(counts, total_weight, n_samples);
        };

        // Partition in place: left block first
        let mut split_at = 0;
        for k in 0..indices.len() {
            if data.x[[indices[k], best.feature_idx]] <= best.threshold {
                indices.swap(k, split_at);
                split_at += 1;
            }
        }

        importances[best.feature_idx] += total_weight * best.gain;

        let (left_idx, right_idx) = indices.split_at_mut(split_at);
        let left = Box::new(self.build_tree(data, left_idx, depth + 1, rng, importances));
        let right = Box::new(self.build_tree(data, right_idx, depth + 1, rng, importances));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Examine features in random order until `max_features` non-constant
    /// ones have been scanned; keep the largest impurity decrease.
    fn find_best_split(
        &self,
        data: &NodeData,
        indices: &[usize],
        parent_counts: &[f64],
        total_weight: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = data.x.ncols();
        let max_features = self.max_features.unwrap_or(n_features).min(n_features);
        let parent_impurity = gini(parent_counts, total_weight);

        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0;
        let mut rows: Vec<(f64, usize)> = Vec::with_capacity(indices.len());

        for feature_idx in features {
            if visited >= max_features {
                break;
            }

            rows.clear();
            rows.extend(indices.iter().map(|&i| (data.x[[i, feature_idx]], i)));
            rows.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (first, last) = (rows[0].0, rows[rows.len() - 1].0);
            if first >= last {
                continue;
            }
            visited += 1;

            let mut left_counts = vec![0.0; data.n_classes];
            let mut left_weight = 0.0;

            for pos in 0..rows.len() - 1 {
                let (value, i) = rows[pos];
                left_counts[data.y[i]] += data.weights[i];
                left_weight += data.weights[i];

                let next_value = rows[pos + 1].0;
                if value >= next_value {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = rows.len() - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let right_weight = total_weight - left_weight;
                let right_counts: Vec<f64> = parent_counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(p, l)| p - l)
                    .collect();

                let weighted_child = (left_weight * gini(&left_counts, left_weight)
                    + right_weight * gini(&right_counts, right_weight))
                    / total_weight;
                let gain = parent_impurity - weighted_child;

                if best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = value + (next_value - value) / 2.0;
                    // Midpoint can round up to the right value
                    if threshold >= next_value {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn leaf_distribution<'a>(&'a self, mut node: &'a TreeNode, sample: ArrayView1<f64>) -> &'a [f64] {
        loop {
            match node {
                TreeNode::Leaf { distribution, .. } => return distribution,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left.as_ref() } else { right.as_ref() };
                }
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        let (classes, encoded) = super::encode_classes(y);
        let weights = vec![1.0; y.len()];
        let indices: Vec<usize> = (0..y.len()).collect();
        self.fit_indexed(x, &encoded, &weights, &classes, &indices)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(ChurnError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (j, p) in self.leaf_distribution(root, row).iter().enumerate() {
                proba[[i, j]] = *p;
            }
        }
        Ok(proba)
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn leaf(counts: Vec<f64>, total: f64, n_samples: usize) -> TreeNode {
    let distribution = if total > 0.0 {
        counts.into_iter().map(|c| c / total).collect()
    } else {
        counts
    };
    TreeNode::Leaf {
        distribution,
        n_samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        // A single split on the first feature separates the classes
        assert!(matches!(tree.root, Some(TreeNode::Split { feature_idx: 0, .. })));
    }

    #[test]
    fn test_xor_needs_zero_gain_split() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0, 1, 1, 0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0, 1, 0, 1];

        let mut tree = DecisionTree::new().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        // Depth one: a split whose children are both leaves
        match tree.root {
            Some(TreeNode::Split { left, right, .. }) => {
                assert!(matches!(*left, TreeNode::Leaf { .. }));
                assert!(matches!(*right, TreeNode::Leaf { .. }));
            }
            other => panic!("expected a split at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let x = array![[1.0], [1.0], [2.0], [3.0]];
        let y = array![0, 1, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();
        let proba = tree.predict_proba(&x).unwrap();

        // Duplicate x with different labels end in a mixed leaf
        assert!((proba[[0, 0]] - 0.5).abs() < 1e-12);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new();
        assert!(matches!(tree.predict_proba(&array![[1.0]]), Err(ChurnError::ModelNotFitted)));
    }
}
