//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    column_names, feature_matrix, load_data, split_features_target, target_vector, DataSaver,
};
