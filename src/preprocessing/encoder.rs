//! Categorical label encoding
//!
//! Categories of each column are sorted and numbered from zero, so the same
//! set of observed values always yields the same codes. The fitted mapping is
//! persisted and reused at inference time; a new batch is never re-fitted.

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Sorted categories of one column; the code of a category is its index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEncoding {
    pub classes: Vec<String>,
}

impl ColumnEncoding {
    /// Code for a category, if it was seen during fit
    pub fn code(&self, category: &str) -> Option<i64> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
            .map(|i| i as i64)
    }
}

/// Label encoder over string columns of a frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    // column name -> sorted categories
    mappings: BTreeMap<String, ColumnEncoding>,
}

impl LabelEncoder {
    /// Create a new, empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every `String` column in the frame
    pub fn categorical_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|c| matches!(c.dtype(), DataType::String))
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Learn the sorted category list of each named column
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| ChurnError::FeatureNotFound(col_name.clone()))?;
            let ca = column
                .as_materialized_series()
                .str()
                .map_err(|e| ChurnError::PreprocessingError(e.to_string()))?;

            if ca.null_count() > 0 {
                return Err(ChurnError::PreprocessingError(format!(
                    "categorical column '{}' has {} missing values",
                    col_name,
                    ca.null_count()
                )));
            }

            let classes: BTreeSet<String> = ca.into_iter().flatten().map(str::to_string).collect();
            self.mappings.insert(
                col_name.clone(),
                ColumnEncoding {
                    classes: classes.into_iter().collect(),
                },
            );
        }

        Ok(self)
    }

    /// Replace each encoded column with its `i64` codes, keeping column positions.
    ///
    /// Columns missing from the frame are skipped. Values not seen during fit
    /// are an error.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();

        for (col_name, encoding) in &self.mappings {
            let Ok(column) = df.column(col_name) else {
                continue;
            };
            let series = column.as_materialized_series();
            // Already numeric, e.g. a frame that was cleaned earlier
            if !matches!(series.dtype(), DataType::String) {
                continue;
            }
            let ca = series
                .str()
                .map_err(|e| ChurnError::PreprocessingError(e.to_string()))?;

            let codes = ca
                .into_iter()
                .map(|v| match v {
                    Some(s) => encoding.code(s).ok_or_else(|| {
                        ChurnError::PreprocessingError(format!(
                            "column '{}' contains previously unseen label '{}'",
                            col_name, s
                        ))
                    }),
                    None => Err(ChurnError::PreprocessingError(format!(
                        "categorical column '{}' has missing values",
                        col_name
                    ))),
                })
                .collect::<Result<Vec<i64>>>()?;

            result.with_column(Series::new(col_name.as_str().into(), codes))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Encoding learned for a column
    pub fn encoding(&self, column: &str) -> Option<&ColumnEncoding> {
        self.mappings.get(column)
    }

    /// Encoded column names, sorted
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Save as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
