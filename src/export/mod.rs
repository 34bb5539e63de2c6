//! Model persistence
//!
//! A trained pipeline is stored as one binary file holding the fitted stages,
//! the categorical encoding used to produce the training data, and metadata
//! describing how the model was built.

mod serializer;

pub use serializer::{load_model, save_model, ModelArtifact, ModelMetadata, SerializedModel};
