//! Data loading utilities
//!
//! CSV in, CSV out, and the conversion from named frame columns to the dense
//! matrices the models consume.

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Rows scanned when inferring column types
const INFER_SCHEMA_LENGTH: usize = 1000;

/// Load a CSV file with a header row into a DataFrame
pub fn load_data(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| ChurnError::DataError(format!("{}: {}", path.display(), e)))?
        .finish()
        .map_err(|e| ChurnError::DataError(format!("{}: {}", path.display(), e)))?;

    debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded CSV");
    Ok(df)
}

/// Save DataFrames to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, replacing any existing file. Parent directories are created.
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| ChurnError::DataError(e.to_string()))?;

        debug!(path = %path.display(), rows = df.height(), "Wrote CSV");
        Ok(())
    }
}

/// Column names of a frame, in order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Split a frame into its feature columns and the integer label vector
pub fn split_features_target(df: &DataFrame, target: &str) -> Result<(DataFrame, Array1<i64>)> {
    let y = target_vector(df, target)?;
    let x = df.drop(target)?;
    Ok((x, y))
}

/// Build a dense `(rows, columns)` matrix from the named columns, in the order given.
///
/// Every column must exist and be castable to `f64` without missing values.
pub fn feature_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let mut x = Array2::<f64>::zeros((n_rows, columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let column = df
            .column(name)
            .map_err(|_| ChurnError::FeatureNotFound(name.clone()))?;
        let series = column.as_materialized_series();

        if series.null_count() > 0 {
            return Err(ChurnError::DataError(format!(
                "column '{}' has {} missing values",
                name,
                series.null_count()
            )));
        }

        let casted = series
            .cast(&DataType::Float64)
            .map_err(|e| ChurnError::DataError(format!("column '{}': {}", name, e)))?;
        let values = casted.f64()?;

        // Strict casts turn unparsable strings into nulls
        if values.null_count() > 0 {
            return Err(ChurnError::DataError(format!(
                "column '{}' is not numeric",
                name
            )));
        }

        for (i, v) in values.into_iter().enumerate() {
            x[[i, j]] = v.unwrap_or(0.0);
        }
    }

    Ok(x)
}

/// Extract the label column as `i64` class codes
pub fn target_vector(df: &DataFrame, target: &str) -> Result<Array1<i64>> {
    let column = df
        .column(target)
        .map_err(|_| ChurnError::FeatureNotFound(target.to_string()))?;
    let series = column.as_materialized_series();

    let casted = series
        .cast(&DataType::Int64)
        .map_err(|e| ChurnError::DataError(format!("target '{}': {}", target, e)))?;
    let values = casted.i64()?;

    if values.null_count() > 0 {
        return Err(ChurnError::DataError(format!(
            "target '{}' must hold integer class codes without missing values",
            target
        )));
    }

    Ok(values.into_iter().map(|v| v.unwrap_or(0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv() {
        let tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(tmp.as_file(), "gender,tenure,Churn").unwrap();
        writeln!(tmp.as_file(), "Male,1,No").unwrap();
        writeln!(tmp.as_file(), "Female,34,Yes").unwrap();
        tmp.as_file().flush().unwrap();

        let df = load_data(tmp.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(column_names(&df), vec!["gender", "tenure", "Churn"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_data("definitely/not/here.csv");
        assert!(matches!(result, Err(ChurnError::DataError(_))));
    }

    #[test]
    fn test_feature_matrix_follows_requested_order() {
        let df = df!(
            "a" => &[1i64, 2, 3],
            "b" => &[0.5, 1.5, 2.5]
        )
        .unwrap();

        let x = feature_matrix(&df, &["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(x.shape(), &[3, 2]);
        assert_eq!(x[[0, 0]], 0.5);
        assert_eq!(x[[2, 1]], 3.0);
    }

    #[test]
    fn test_feature_matrix_missing_column() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        let result = feature_matrix(&df, &["tenure".to_string()]);
        assert!(matches!(result, Err(ChurnError::FeatureNotFound(name)) if name == "tenure"));
    }

    #[test]
    fn test_split_features_target() {
        let df = df!(
            "tenure" => &[1i64, 5, 9],
            "Churn" => &[0i64, 1, 0]
        )
        .unwrap();

        let (x, y) = split_features_target(&df, "Churn").unwrap();
        assert_eq!(column_names(&x), vec!["tenure"]);
        assert_eq!(y.to_vec(), vec![0, 1, 0]);
    }

    #[test]
    fn test_save_csv_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let mut first = df!("a" => &[1i64, 2, 3]).unwrap();
        DataSaver::save_csv(&mut first, &path).unwrap();
        let mut second = df!("a" => &[7i64]).unwrap();
        DataSaver::save_csv(&mut second, &path).unwrap();

        let reloaded = load_data(&path).unwrap();
        assert_eq!(reloaded.height(), 1);
    }
}
