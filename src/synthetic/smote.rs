//! SMOTE (Synthetic Minority Over-sampling Technique)

use crate::error::{ChurnError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler};
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Distance/index pair for the bounded max-heap; ties break on index
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// SMOTE oversampler
///
/// Every class below the majority count is grown to that count by
/// interpolating between a random class member and one of its `k` nearest
/// same-class neighbours. Generation is fully determined by the seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smote {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: u64,
    /// Target samples per class, learned by `fit`
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl Smote {
    /// Create new SMOTE sampler
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
    }

    /// k nearest neighbours of every row of `samples`, excluding the row itself
    fn neighbor_table(&self, samples: &Array2<f64>) -> Vec<Vec<usize>> {
        let n = samples.nrows();
        let k = self.k_neighbors;

        (0..n)
            .map(|i| {
                let point = samples.row(i);
                let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
                for j in 0..n {
                    if j == i {
                        continue;
                    }
                    let candidate = DistIdx(Self::squared_distance(point, samples.row(j)), j);
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if let Some(top) = heap.peek() {
                        if candidate < *top {
                            heap.pop();
                            heap.push(candidate);
                        }
                    }
                }
                heap.into_sorted_vec().into_iter().map(|DistIdx(_, j)| j).collect()
            })
            .collect()
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for Smote {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(ChurnError::ValidationError(
                "Need at least 2 classes for SMOTE".to_string(),
            ));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);

        for (&class, &count) in &counts {
            if count < max_count && count <= self.k_neighbors {
                return Err(ChurnError::ValidationError(format!(
                    "SMOTE needs more than k_neighbors = {} samples per minority class, class {} has {}",
                    self.k_neighbors, class, count
                )));
            }
        }

        self.target_counts = Some(counts.keys().map(|&class| (class, max_count)).collect());
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let targets = self
            .target_counts
            .as_ref()
            .ok_or(ChurnError::ModelNotFitted)?;

        if x.nrows() != y.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices = class_indices(y);
        let n_features = x.ncols();

        let mut synthetic_x: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, &target_count) in targets {
            let class_idx = indices.get(&class).map(Vec::as_slice).unwrap_or(&[]);
            let n_to_generate = target_count.saturating_sub(class_idx.len());
            n_synthetic.insert(class, n_to_generate);

            if n_to_generate == 0 {
                continue;
            }
            if class_idx.len() <= self.k_neighbors {
                return Err(ChurnError::ValidationError(format!(
                    "class {} has {} samples, SMOTE needs more than {}",
                    class,
                    class_idx.len(),
                    self.k_neighbors
                )));
            }

            let class_samples = x.select(ndarray::Axis(0), class_idx);
            let neighbors = self.neighbor_table(&class_samples);

            for _ in 0..n_to_generate {
                let idx = rng.gen_range(0..class_samples.nrows());
                let neighbor = neighbors[idx][rng.gen_range(0..neighbors[idx].len())];
                let gap: f64 = rng.gen();

                let point = class_samples.row(idx);
                let other = class_samples.row(neighbor);
                synthetic_x.extend(point.iter().zip(other.iter()).map(|(&p, &n)| p + gap * (n - p)));
                synthetic_y.push(class);
            }
        }

        let n_original = x.nrows();
        let n_new = synthetic_y.len();
        let result_x = Array2::from_shape_fn((n_original + n_new, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[(i - n_original) * n_features + j]
            }
        });

        let mut all_y: Vec<i64> = y.to_vec();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}
