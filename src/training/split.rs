//! Stratified train/test splitting

use crate::error::{ChurnError, Result};
use crate::synthetic::class_indices;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row partitions produced by a split
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    /// Original row positions of the training rows
    pub train_indices: Vec<usize>,
    /// Original row positions of the test rows
    pub test_indices: Vec<usize>,
}

/// Stratified splitter
///
/// Each class contributes to the test partition in proportion to its share of
/// the data. Rows are shuffled per class with a seeded generator, classes are
/// visited in label order, so the partition depends only on `y`, `test_size`
/// and the seed.
#[derive(Debug, Clone)]
pub struct StratifiedSplitter {
    test_size: f64,
    random_state: u64,
}

impl Default for StratifiedSplitter {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl StratifiedSplitter {
    /// Create a new splitter holding out `test_size` of the rows
    pub fn new(test_size: f64) -> Self {
        Self {
            test_size,
            random_state: 42,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Compute `(train_indices, test_indices)` for the labels `y`
    pub fn split_indices(&self, y: &Array1<i64>) -> Result<(Vec<usize>, Vec<usize>)> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ChurnError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be strictly between 0 and 1".to_string(),
            });
        }

        let n_samples = y.len();
        let by_class = class_indices(y);
        let n_classes = by_class.len();

        for (class, members) in &by_class {
            if members.len() < 2 {
                return Err(ChurnError::ValidationError(format!(
                    "The least populated class {} has only {} member; stratified splitting needs at least 2",
                    class,
                    members.len()
                )));
            }
        }

        let n_test = (self.test_size * n_samples as f64).ceil() as usize;
        let n_train = n_samples - n_test;
        if n_test < n_classes || n_train < n_classes {
            return Err(ChurnError::ValidationError(format!(
                "test size {} and train size {} must both be at least the number of classes {}",
                n_test, n_train, n_classes
            )));
        }

        let allocation = allocate(&by_class.values().map(Vec::len).collect::<Vec<_>>(), n_test);

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut train = Vec::with_capacity(n_train);
        let mut test = Vec::with_capacity(n_test);

        for (members, &take) in by_class.values().zip(&allocation) {
            let mut shuffled = members.clone();
            shuffled.shuffle(&mut rng);
            test.extend_from_slice(&shuffled[..take]);
            train.extend_from_slice(&shuffled[take..]);
        }

        // Interleave classes so neither partition is ordered by label
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        Ok((train, test))
    }

    /// Split features and labels
    pub fn split(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<TrainTestSplit> {
        if x.nrows() != y.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let (train_indices, test_indices) = self.split_indices(y)?;

        Ok(TrainTestSplit {
            x_train: x.select(Axis(0), &train_indices),
            x_test: x.select(Axis(0), &test_indices),
            y_train: y.select(Axis(0), &train_indices),
            y_test: y.select(Axis(0), &test_indices),
            train_indices,
            test_indices,
        })
    }
}

/// Largest-remainder allocation of `total` slots over classes sized `counts`
fn allocate(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let quotas: Vec<f64> = counts
        .iter()
        .map(|&c| total as f64 * c as f64 / n as f64)
        .collect();

    let mut allocation: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = allocation.iter().sum();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    // Stable sort keeps label order among equal remainders
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra)
    });

    for &class in order.iter().take(total.saturating_sub(assigned)) {
        allocation[class] += 1;
    }

    allocation
}

/// Stratified split with an explicit fraction and seed
pub fn split_data(
    x: &Array2<f64>,
    y: &Array1<i64>,
    test_size: f64,
    random_state: u64,
) -> Result<TrainTestSplit> {
    StratifiedSplitter::new(test_size)
        .with_random_state(random_state)
        .split(x, y)
}
