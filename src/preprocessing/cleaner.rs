//! Raw dataset cleaning
//!
//! Drops identifier and leak-prone columns, label-encodes every string
//! column in place, and writes the result to CSV.

use super::encoder::LabelEncoder;
use crate::config::CleaningConfig;
use crate::error::Result;
use crate::utils::{column_names, load_data, DataSaver};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the label encoding written beside a cleaned CSV
pub const ENCODER_FILE_NAME: &str = "label_encoding.json";

/// Where `clean_data` puts the label encoding for a cleaned CSV at `output`
pub fn encoder_path_for(output: impl AsRef<Path>) -> PathBuf {
    output.as_ref().with_file_name(ENCODER_FILE_NAME)
}

/// Output of a cleaning run
#[derive(Debug, Clone)]
pub struct CleanedData {
    /// Encoded frame, as written to disk
    pub cleaned: DataFrame,
    /// Same rows and columns before encoding
    pub backup: DataFrame,
    /// Mapping used for the encoded columns
    pub encoder: LabelEncoder,
    /// Where the cleaned CSV was written
    pub output_path: PathBuf,
}

/// Cleaner for raw customer exports
#[derive(Debug, Clone)]
pub struct DataCleaner {
    drop_columns: Vec<String>,
    encoder_path: Option<PathBuf>,
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::new(&CleaningConfig::default())
    }
}

impl DataCleaner {
    /// Create a cleaner from configuration
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            drop_columns: config.drop_columns.clone(),
            encoder_path: None,
        }
    }

    /// Also persist the fitted encoder as JSON at this path
    pub fn with_encoder_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.encoder_path = Some(path.into());
        self
    }

    /// Clean an in-memory frame. Returns `(cleaned, backup, encoder)`.
    pub fn clean(&self, df: &DataFrame) -> Result<(DataFrame, DataFrame, LabelEncoder)> {
        let present = column_names(df);
        let mut trimmed = df.clone();
        for name in &self.drop_columns {
            if present.iter().any(|c| c == name) {
                trimmed = trimmed.drop(name)?;
                debug!(column = %name, "Dropped column");
            }
        }

        let backup = trimmed.clone();

        let categorical = LabelEncoder::categorical_columns(&trimmed);
        let mut encoder = LabelEncoder::new();
        let cleaned = encoder.fit_transform(&trimmed, &categorical)?;
        debug!(columns = ?categorical, "Label-encoded categorical columns");

        Ok((cleaned, backup, encoder))
    }

    /// Load `input`, clean it, and write the result to `output` (replacing it)
    pub fn clean_file(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<CleanedData> {
        let output = output.as_ref();
        let raw = load_data(input.as_ref())?;
        let (mut cleaned, backup, encoder) = self.clean(&raw)?;

        DataSaver::save_csv(&mut cleaned, output)?;
        info!(path = %output.display(), rows = cleaned.height(), cols = cleaned.width(), "Clean data saved");

        if let Some(path) = &self.encoder_path {
            encoder.save(path)?;
            info!(path = %path.display(), "Label encoding saved");
        }

        Ok(CleanedData {
            cleaned,
            backup,
            encoder,
            output_path: output.to_path_buf(),
        })
    }
}

/// Clean a raw CSV with the default column list and write it to `output`.
/// The label encoding is saved next to it as [`ENCODER_FILE_NAME`].
pub fn clean_data(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<CleanedData> {
    let output = output.as_ref();
    DataCleaner::default()
        .with_encoder_path(encoder_path_for(output))
        .clean_file(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df!(
            "customerID" => &["7590-VHVEG", "5575-GNVDE", "3668-QPYBK"],
            "gender" => &["Female", "Male", "Male"],
            "tenure" => &[1i64, 34, 2],
            "TotalCharges" => &["29.85", "1889.5", ""],
            "Churn" => &["No", "No", "Yes"]
        )
        .unwrap()
    }

    #[test]
    fn test_clean_drops_and_encodes() {
        let (cleaned, backup, encoder) = DataCleaner::default().clean(&raw_frame()).unwrap();

        assert_eq!(column_names(&cleaned), vec!["gender", "tenure", "Churn"]);
        assert_eq!(column_names(&backup), vec!["gender", "tenure", "Churn"]);

        let gender: Vec<i64> = cleaned.column("gender").unwrap().as_materialized_series()
            .i64().unwrap().into_iter().flatten().collect();
        assert_eq!(gender, vec![0, 1, 1]);

        let churn: Vec<i64> = cleaned.column("Churn").unwrap().as_materialized_series()
            .i64().unwrap().into_iter().flatten().collect();
        assert_eq!(churn, vec![0, 0, 1]);

        // Backup keeps the original strings
        assert!(matches!(backup.column("gender").unwrap().dtype(), DataType::String));
        assert_eq!(encoder.columns().collect::<Vec<_>>(), vec!["Churn", "gender"]);
    }

    #[test]
    fn test_clean_tolerates_missing_drop_columns() {
        let df = df!(
            "tenure" => &[1i64, 2],
            "Churn" => &[0i64, 1]
        )
        .unwrap();

        let (cleaned, _, encoder) = DataCleaner::default().clean(&df).unwrap();
        assert_eq!(column_names(&cleaned), vec!["tenure", "Churn"]);
        assert!(encoder.is_empty());
    }

    #[test]
    fn test_clean_file_writes_csv_and_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        let output = dir.path().join("processed").join("clean.csv");
        let encoder_path = dir.path().join("processed").join("encoding.json");

        let mut raw = df!(
            "customerID" => &["a", "b"],
            "Contract" => &["One year", "Month-to-month"],
            "Churn" => &["Yes", "No"]
        )
        .unwrap();
        DataSaver::save_csv(&mut raw, &input).unwrap();

        let result = DataCleaner::default()
            .with_encoder_path(&encoder_path)
            .clean_file(&input, &output)
            .unwrap();

        assert_eq!(result.output_path, output);
        let reloaded = load_data(&output).unwrap();
        assert_eq!(column_names(&reloaded), vec!["Contract", "Churn"]);

        let encoder = LabelEncoder::load(&encoder_path).unwrap();
        assert_eq!(encoder, result.encoder);
    }

    #[test]
    fn test_clean_data_saves_encoding_beside_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw").join("customers.csv");
        let output = dir.path().join("processed").join("clean.csv");
        DataSaver::save_csv(&mut raw_frame(), &input).unwrap();

        let result = clean_data(&input, &output).unwrap();

        let encoder_path = encoder_path_for(&output);
        assert_eq!(encoder_path, dir.path().join("processed").join(ENCODER_FILE_NAME));
        let encoder = LabelEncoder::load(&encoder_path).unwrap();
        assert_eq!(encoder, result.encoder);
        assert_eq!(encoder.columns().collect::<Vec<_>>(), vec!["Churn", "gender"]);
    }
}
