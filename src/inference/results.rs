//! Prediction results: attach, preview, save

use crate::error::{ChurnError, Result};
use crate::utils::DataSaver;
use ndarray::Array1;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Column holding the predicted label
pub const PREDICTION_COLUMN: &str = "Churn_Prediction";
/// Column holding the positive-class probability
pub const PROBABILITY_COLUMN: &str = "Churn_Probability";
/// Rows previewed after scoring new data
pub const PREDICTION_PREVIEW_ROWS: usize = 5;

/// Append the prediction and probability columns to a copy of `features`
pub fn attach_predictions(
    features: &DataFrame,
    predictions: &Array1<i64>,
    probabilities: &Array1<f64>,
) -> Result<DataFrame> {
    if predictions.len() != features.height() || probabilities.len() != features.height() {
        return Err(ChurnError::ShapeError {
            expected: format!("{} rows", features.height()),
            actual: format!("{} predictions, {} probabilities", predictions.len(), probabilities.len()),
        });
    }

    let mut results = features.clone();
    results.with_column(Series::new(PREDICTION_COLUMN.into(), predictions.to_vec()))?;
    results.with_column(Series::new(PROBABILITY_COLUMN.into(), probabilities.to_vec()))?;
    Ok(results)
}

/// First `n` rows of the prediction columns
fn preview(results: &DataFrame, n: usize) -> Result<DataFrame> {
    Ok(results
        .select([PREDICTION_COLUMN, PROBABILITY_COLUMN])?
        .head(Some(n)))
}

/// Print the first `n` rows of the prediction columns
pub fn display_results(results: &DataFrame, n: usize) -> Result<()> {
    println!("{}", preview(results, n)?);
    Ok(())
}

/// Write the full results frame to CSV, replacing any existing file
pub fn save_results(results: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    DataSaver::save_csv(results, path)?;
    info!(path = %path.display(), rows = results.height(), "Predictions saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{column_names, load_data};
    use ndarray::array;

    #[test]
    fn test_attach_predictions() {
        let features = df!("tenure" => &[1i64, 40, 3]).unwrap();
        let results = attach_predictions(&features, &array![1, 0, 1], &array![0.9, 0.1, 0.5]).unwrap();

        assert_eq!(column_names(&results), vec!["tenure", PREDICTION_COLUMN, PROBABILITY_COLUMN]);
        assert_eq!(features.width(), 1);
    }

    #[test]
    fn test_attach_length_mismatch() {
        let features = df!("tenure" => &[1i64, 2]).unwrap();
        assert!(attach_predictions(&features, &array![1], &array![0.7]).is_err());
    }

    #[test]
    fn test_preview_shows_prediction_columns_only() {
        let features = df!("tenure" => (0..8i64).collect::<Vec<_>>()).unwrap();
        let labels = Array1::from_shape_fn(8, |i| (i % 2) as i64);
        let proba = labels.mapv(|l| if l == 1 { 0.75 } else { 0.25 });
        let results = attach_predictions(&features, &labels, &proba).unwrap();

        let shown = preview(&results, PREDICTION_PREVIEW_ROWS).unwrap();
        assert_eq!(shown.height(), PREDICTION_PREVIEW_ROWS);
        assert_eq!(column_names(&shown), vec![PREDICTION_COLUMN, PROBABILITY_COLUMN]);
    }

    #[test]
    fn test_display_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions").join("out.csv");

        let features = df!("tenure" => &[1i64, 2]).unwrap();
        let mut results = attach_predictions(&features, &array![0, 1], &array![0.2, 0.8]).unwrap();
        display_results(&results, 10).unwrap();
        save_results(&mut results, &path).unwrap();

        let reloaded = load_data(&path).unwrap();
        assert_eq!(reloaded.height(), 2);
        assert_eq!(column_names(&reloaded), column_names(&results));
    }
}
