//! Pipeline configuration
//!
//! Every path and hyperparameter the stages use lives here. Defaults match the
//! layout the project has always shipped with, so running without a config
//! file behaves exactly like the fixed batch run.

use crate::error::{ChurnError, Result};
use crate::training::{ClassWeight, MaxFeatures};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File locations shared between stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw customer export
    pub raw_data: PathBuf,
    /// Cleaned, label-encoded dataset
    pub clean_data: PathBuf,
    /// Persisted category → code mapping
    pub encoder: PathBuf,
    /// Fitted pipeline artifact
    pub model: PathBuf,
    /// Predictions written by the evaluation run
    pub predictions: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_data: PathBuf::from("notebook/data/raw/customer_churn.csv"),
            clean_data: PathBuf::from("notebook/data/processed/clean_data.csv"),
            encoder: PathBuf::from("notebook/data/processed/label_encoding.json"),
            model: PathBuf::from("models/random_forest_churn.bin"),
            predictions: PathBuf::from("notebook/data/predictions/churn_predictions.csv"),
        }
    }
}

/// Configuration for the cleaning stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Columns removed before encoding (absent columns are ignored)
    pub drop_columns: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            drop_columns: vec!["customerID".to_string(), "TotalCharges".to_string()],
        }
    }
}

impl CleaningConfig {
    /// Builder method to set the dropped columns
    pub fn with_drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Configuration for model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Label column name
    pub target_column: String,

    /// Fraction of rows held out by the stratified split
    pub test_size: f64,

    /// Seed shared by the split, the resampler and the forest
    pub random_state: u64,

    /// Number of trees
    pub n_estimators: usize,

    /// Neighbours considered by SMOTE
    pub k_neighbors: usize,

    /// Class weighting applied by the forest
    pub class_weight: ClassWeight,

    /// Maximum tree depth (None = grow until pure)
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Minimum samples in a leaf
    pub min_samples_leaf: usize,

    /// Features considered per split
    pub max_features: MaxFeatures,

    /// Fit each tree on a bootstrap sample of the training rows
    pub bootstrap: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "Churn".to_string(),
            test_size: 0.2,
            random_state: 42,
            n_estimators: 200,
            k_neighbors: 5,
            class_weight: ClassWeight::Balanced,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set SMOTE neighbours
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
        self
    }

    /// Builder method to set the maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Builder method to set the class weighting
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }
}

/// Top-level configuration passed to every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub cleaning: CleaningConfig,
    pub training: TrainingConfig,
    /// Rows shown by the results preview
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            cleaning: CleaningConfig::default(),
            training: TrainingConfig::default(),
            preview_rows: 10,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to replace the training section
    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    /// Builder method to replace the paths section
    pub fn with_paths(mut self, paths: PathsConfig) -> Self {
        self.paths = paths;
        self
    }

    /// Check parameter ranges before any stage runs
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if !(t.test_size > 0.0 && t.test_size < 1.0) {
            return Err(ChurnError::InvalidParameter {
                name: "test_size".to_string(),
                value: t.test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if t.n_estimators == 0 {
            return Err(ChurnError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if t.k_neighbors == 0 {
            return Err(ChurnError::InvalidParameter {
                name: "k_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if t.min_samples_split < 2 {
            return Err(ChurnError::InvalidParameter {
                name: "min_samples_split".to_string(),
                value: t.min_samples_split.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if t.min_samples_leaf == 0 {
            return Err(ChurnError::InvalidParameter {
                name: "min_samples_leaf".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if t.target_column.is_empty() {
            return Err(ChurnError::ConfigError("target_column is empty".to_string()));
        }
        Ok(())
    }
}
