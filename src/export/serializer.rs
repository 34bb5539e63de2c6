//! Model serialization utilities

use crate::config::TrainingConfig;
use crate::error::{ChurnError, Result};
use crate::pipeline::ChurnPipeline;
use crate::preprocessing::LabelEncoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,
    /// Crate version that wrote the file
    pub version: String,
    /// Training timestamp (RFC 3339)
    pub trained_at: String,
    /// Feature names in fitted order
    pub feature_names: Vec<String>,
    /// Target name
    pub target_name: String,
    /// Model type
    pub model_type: String,
    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
    /// Rows used for fitting, before resampling
    pub n_training_rows: usize,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "churn_model".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: String::new(),
            feature_names: Vec::new(),
            target_name: "Churn".to_string(),
            model_type: "random_forest".to_string(),
            hyperparameters: BTreeMap::new(),
            n_training_rows: 0,
        }
    }
}

impl ModelMetadata {
    /// Describe a pipeline trained with `config`, stamped with the current time
    pub fn for_training(config: &TrainingConfig, feature_names: &[String], n_training_rows: usize) -> Self {
        let metadata = Self {
            trained_at: chrono::Utc::now().to_rfc3339(),
            feature_names: feature_names.to_vec(),
            target_name: config.target_column.clone(),
            n_training_rows,
            ..Default::default()
        };

        metadata
            .add_hyperparameter("n_estimators", config.n_estimators.to_string())
            .add_hyperparameter("class_weight", format!("{:?}", config.class_weight))
            .add_hyperparameter("max_features", format!("{:?}", config.max_features))
            .add_hyperparameter("max_depth", format!("{:?}", config.max_depth))
            .add_hyperparameter("bootstrap", config.bootstrap.to_string())
            .add_hyperparameter("k_neighbors", config.k_neighbors.to_string())
            .add_hyperparameter("random_state", config.random_state.to_string())
            .add_hyperparameter("test_size", config.test_size.to_string())
    }

    /// Add hyperparameter
    pub fn add_hyperparameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hyperparameters.insert(key.into(), value.into());
        self
    }
}

/// Everything needed to score new raw rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ModelMetadata,
    pub pipeline: ChurnPipeline,
    /// Category mapping the training data was encoded with
    pub encoder: Option<LabelEncoder>,
}

impl ModelArtifact {
    pub fn new(metadata: ModelMetadata, pipeline: ChurnPipeline) -> Self {
        Self {
            metadata,
            pipeline,
            encoder: None,
        }
    }

    pub fn with_encoder(mut self, encoder: LabelEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }
}

/// On-disk envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedModel {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    /// Serialized artifact
    pub model_data: Vec<u8>,
    /// Checksum for integrity verification
    pub checksum: u64,
}

impl SerializedModel {
    /// Magic bytes for churn model files
    pub const MAGIC: [u8; 4] = [b'C', b'H', b'R', b'N'];
    /// Current format version
    pub const VERSION: u32 = 1;

    /// Create new serialized model
    pub fn new(model_data: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&model_data);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            model_data,
            checksum,
        }
    }

    /// Compute checksum using FNV-1a hash
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    /// Verify checksum
    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.model_data) == self.checksum
    }

    /// Check magic, version and checksum
    fn validate(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(ChurnError::SerializationError(
                "not a churn model file (bad magic bytes)".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(ChurnError::SerializationError(format!(
                "unsupported model format version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if !self.verify_checksum() {
            return Err(ChurnError::SerializationError(
                "Checksum verification failed - file may be corrupted".to_string(),
            ));
        }
        Ok(())
    }
}

/// Save a model artifact to file, replacing any existing one
pub fn save_model(artifact: &ModelArtifact, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !artifact.pipeline.is_fitted() {
        return Err(ChurnError::ModelNotFitted);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let model_data = bincode::serialize(artifact)?;
    let serialized = SerializedModel::new(model_data);

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, &serialized)?;
    writer.flush()?;

    debug!(path = %path.display(), checksum = serialized.checksum, "Model written");
    Ok(())
}

/// Load a model artifact from file
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelArtifact> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        ChurnError::DataError(format!("Failed to open model {}: {}", path.display(), e))
    })?;
    let reader = BufReader::new(file);

    let serialized: SerializedModel = bincode::deserialize_from(reader)?;
    serialized.validate()?;

    let artifact: ModelArtifact = bincode::deserialize(&serialized.model_data)?;
    Ok(artifact)
}
