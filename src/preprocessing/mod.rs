//! Data preprocessing module
//!
//! - Cleaning of raw customer exports (column dropping, label encoding)
//! - Categorical label encoding with a persisted mapping
//! - Standard feature scaling

mod cleaner;
mod encoder;
mod scaler;

pub use cleaner::{clean_data, encoder_path_for, CleanedData, DataCleaner, ENCODER_FILE_NAME};
pub use encoder::{ColumnEncoding, LabelEncoder};
pub use scaler::StandardScaler;

use crate::error::Result;
use ndarray::Array2;

/// Unsupervised matrix transformer with a learned state
pub trait Transformer: Send + Sync {
    /// Learn parameters from training data
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Apply learned parameters
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
