//! Training stage: cleaned CSV in, fitted pipeline artifact out

use super::split::StratifiedSplitter;
use crate::config::PipelineConfig;
use crate::error::{ChurnError, Result};
use crate::export::{save_model, ModelArtifact, ModelMetadata};
use crate::pipeline::ChurnPipeline;
use crate::preprocessing::{encoder_path_for, LabelEncoder};
use crate::utils::{column_names, feature_matrix, load_data, split_features_target};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// What a training run produced
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    /// Rows in the cleaned dataset
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    /// Rows added by oversampling the training split
    pub n_synthetic: usize,
    /// Feature importances, largest first
    pub feature_importances: Vec<(String, f64)>,
    pub model_path: PathBuf,
    pub duration_secs: f64,
}

/// Fits the churn pipeline from configuration
#[derive(Debug, Clone)]
pub struct Trainer {
    config: PipelineConfig,
}

impl Trainer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Split, fit on the training partition, and wrap the result in an artifact.
    /// The label encoding at the configured encoder path is embedded when present.
    pub fn fit_frame(&self, df: &DataFrame) -> Result<(ModelArtifact, TrainingSummary)> {
        let encoder_path = &self.config.paths.encoder;
        self.fit_frame_with(df, encoder_path.exists().then_some(encoder_path.as_path()))
    }

    fn fit_frame_with(
        &self,
        df: &DataFrame,
        encoder_path: Option<&Path>,
    ) -> Result<(ModelArtifact, TrainingSummary)> {
        let start = Instant::now();
        let training = &self.config.training;

        let (features, y) = split_features_target(df, &training.target_column)?;
        let feature_names = column_names(&features);
        let x = feature_matrix(&features, &feature_names)?;

        let mut pipeline = ChurnPipeline::from_config(training);

        let encoder = encoder_path.map(LabelEncoder::load).transpose()?;
        if let Some(encoder) = &encoder {
            check_encoder_columns(encoder, &feature_names, pipeline.target())?;
        }

        let split = StratifiedSplitter::new(training.test_size)
            .with_random_state(training.random_state)
            .split(&x, &y)?;
        debug!(train = split.y_train.len(), test = split.y_test.len(), "Stratified split");

        let report = pipeline.fit(&split.x_train, &split.y_train, &feature_names)?;

        let metadata = ModelMetadata::for_training(training, &feature_names, report.n_rows);
        let mut artifact = ModelArtifact::new(metadata, pipeline);
        if let Some(encoder) = encoder {
            artifact = artifact.with_encoder(encoder);
            debug!("Embedded label encoding");
        }

        let summary = TrainingSummary {
            n_rows: df.height(),
            n_train: split.y_train.len(),
            n_test: split.y_test.len(),
            n_features: feature_names.len(),
            n_synthetic: report.n_synthetic,
            feature_importances: artifact.pipeline.feature_importances(),
            model_path: PathBuf::new(),
            duration_secs: start.elapsed().as_secs_f64(),
        };

        Ok((artifact, summary))
    }

    /// Label encoding for the cleaned CSV at `data_path`: the configured file,
    /// else the one `clean_data` leaves beside the CSV
    fn encoder_path(&self, data_path: &Path) -> Option<PathBuf> {
        let configured = &self.config.paths.encoder;
        if configured.exists() {
            return Some(configured.clone());
        }
        let beside = encoder_path_for(data_path);
        beside.exists().then_some(beside)
    }

    /// Load the cleaned CSV, fit, and persist the artifact at `model_path`
    pub fn train(&self, data_path: impl AsRef<Path>, model_path: impl AsRef<Path>) -> Result<TrainingSummary> {
        let data_path = data_path.as_ref();
        let model_path = model_path.as_ref();
        let df = load_data(data_path)?;

        let encoder_path = self.encoder_path(data_path);
        let (artifact, mut summary) = self.fit_frame_with(&df, encoder_path.as_deref())?;
        save_model(&artifact, model_path)?;
        summary.model_path = model_path.to_path_buf();

        info!(
            rows = summary.n_train,
            synthetic = summary.n_synthetic,
            features = summary.n_features,
            secs = summary.duration_secs,
            "Model trained"
        );
        for (name, importance) in summary.feature_importances.iter().take(5) {
            debug!(feature = %name, importance, "Feature importance");
        }
        info!(path = %model_path.display(), "Model saved");

        Ok(summary)
    }
}

/// Every encoded column must be a feature or the target of this dataset
fn check_encoder_columns(encoder: &LabelEncoder, feature_names: &[String], target: &str) -> Result<()> {
    let unknown: Vec<&str> = encoder
        .columns()
        .filter(|column| *column != target && !feature_names.iter().any(|f| f == column))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ChurnError::ValidationError(format!(
            "label encoding does not match the training data; unknown columns: {}",
            unknown.join(", ")
        )))
    }
}

/// Train on the cleaned CSV at `data_path` and save the model to `model_path`
pub fn train_model(
    data_path: impl AsRef<Path>,
    model_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<TrainingSummary> {
    Trainer::new(config).train(data_path, model_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::export::load_model;
    use crate::utils::DataSaver;
    use polars::prelude::*;

    fn cleaned_frame() -> DataFrame {
        let tenure: Vec<i64> = (0..40).map(|i| if i < 30 { 20 + i } else { i - 30 }).collect();
        let contract: Vec<i64> = (0..40).map(|i| if i < 30 { (i % 2) + 1 } else { 0 }).collect();
        let churn: Vec<i64> = (0..40).map(|i| i64::from(i >= 30)).collect();
        df!(
            "tenure" => tenure,
            "Contract" => contract,
            "Churn" => churn
        )
        .unwrap()
    }

    fn config(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::new()
            .with_training(TrainingConfig::new().with_n_estimators(12).with_k_neighbors(3));
        config.paths.encoder = dir.join("label_encoding.json");
        config
    }

    #[test]
    fn test_fit_frame_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (artifact, summary) = Trainer::new(&config(dir.path())).fit_frame(&cleaned_frame()).unwrap();

        assert_eq!(summary.n_rows, 40);
        assert_eq!(summary.n_test, 8);
        assert_eq!(summary.n_train, 32);
        assert_eq!(summary.n_features, 2);
        // 24 negatives vs 8 positives in the training split
        assert_eq!(summary.n_synthetic, 16);
        assert_eq!(artifact.pipeline.feature_names(), &["tenure".to_string(), "Contract".to_string()]);
        assert!(artifact.encoder.is_none());
    }

    #[test]
    fn test_train_model_writes_artifact_with_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let data_path = dir.path().join("clean.csv");
        DataSaver::save_csv(&mut cleaned_frame(), &data_path).unwrap();

        let encoder: LabelEncoder =
            serde_json::from_str(r#"{"mappings":{"Churn":{"classes":["No","Yes"]}}}"#).unwrap();
        encoder.save(&config.paths.encoder).unwrap();

        let model_path = dir.path().join("models").join("rf.bin");
        let summary = train_model(&data_path, &model_path, &config).unwrap();
        assert_eq!(summary.model_path, model_path);

        let artifact = load_model(&model_path).unwrap();
        assert_eq!(artifact.encoder, Some(encoder));
        assert_eq!(artifact.metadata.n_training_rows, 32);
        assert_eq!(artifact.metadata.hyperparameters["n_estimators"], "12");
    }

    #[test]
    fn test_stale_encoding_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        // Encoding written for a dataset with a PaymentMethod column
        let encoder: LabelEncoder = serde_json::from_str(
            r#"{"mappings":{"PaymentMethod":{"classes":["Card","Check"]},"Churn":{"classes":["No","Yes"]}}}"#,
        )
        .unwrap();
        encoder.save(&config.paths.encoder).unwrap();

        let err = Trainer::new(&config).fit_frame(&cleaned_frame()).unwrap_err();
        match err {
            ChurnError::ValidationError(msg) => assert!(msg.contains("PaymentMethod"), "{}", msg),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_encoding_found_beside_cleaned_csv() {
        let dir = tempfile::tempdir().unwrap();
        // Configured encoder path does not exist
        let config = config(dir.path());

        let data_path = dir.path().join("processed").join("clean.csv");
        DataSaver::save_csv(&mut cleaned_frame(), &data_path).unwrap();
        let encoder: LabelEncoder =
            serde_json::from_str(r#"{"mappings":{"Contract":{"classes":["A","B","C"]}}}"#).unwrap();
        encoder.save(encoder_path_for(&data_path)).unwrap();

        let model_path = dir.path().join("rf.bin");
        train_model(&data_path, &model_path, &config).unwrap();
        assert_eq!(load_model(&model_path).unwrap().encoder, Some(encoder));
    }

    #[test]
    fn test_missing_target_column() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!("tenure" => &[1i64, 2, 3]).unwrap();
        assert!(Trainer::new(&config(dir.path())).fit_frame(&df).is_err());
    }
}
