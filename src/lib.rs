//! Churn Pipeline - customer churn prediction in four batch stages
//!
//! This crate cleans raw customer exports, trains a classifier, evaluates it,
//! and scores new data:
//!
//! ```text
//! raw CSV ──clean──▶ cleaned CSV + label encoding
//!                          │
//!                        train ──▶ model artifact (scaler → SMOTE → random forest)
//!                          │
//!            evaluate / predict ──▶ predictions CSV
//! ```
//!
//! # Modules
//!
//! ## Stages
//! - [`preprocessing`] - Column dropping, label encoding, standard scaling
//! - [`training`] - Decision trees, random forest, stratified split, training stage
//! - [`evaluation`] - Classification report and ROC-AUC
//! - [`inference`] - Prediction on new data and the evaluation run
//!
//! ## Building blocks
//! - [`synthetic`] - SMOTE oversampling
//! - [`pipeline`] - Tagged sequence of fitted stages
//! - [`export`] - Model artifact persistence
//! - [`utils`] - CSV loading and matrix conversion
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod error;
pub mod config;

// Pipeline stages
pub mod preprocessing;
pub mod training;
pub mod evaluation;
pub mod inference;

// Building blocks
pub mod synthetic;
pub mod pipeline;
pub mod export;
pub mod utils;

// Interfaces
pub mod cli;

pub use error::{ChurnError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{CleaningConfig, PathsConfig, PipelineConfig, TrainingConfig};
    pub use crate::error::{ChurnError, Result};
    pub use crate::evaluation::{evaluate_model, roc_auc_score, ClassificationReport, Evaluation};
    pub use crate::export::{load_model, save_model, ModelArtifact, ModelMetadata};
    pub use crate::inference::{display_results, make_predictions, predict_new, run_evaluation, save_results};
    pub use crate::pipeline::{ChurnPipeline, NamedStage, Stage};
    pub use crate::preprocessing::{clean_data, DataCleaner, LabelEncoder, StandardScaler, Transformer};
    pub use crate::synthetic::{Sampler, Smote};
    pub use crate::training::{
        split_data, train_model, ClassWeight, Classifier, MaxFeatures, RandomForest, TrainTestSplit,
    };
    pub use crate::utils::{load_data, split_features_target, DataSaver};
}
