// src/core/errors.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdrError {
    #[error("Invalid Input: {0}")]
    InvalidInput(String),
    #[error("Incompatible Dimensions: {0}")]
    IncompatibleDimensions(String),
    #[error("Missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Configuration Error: {0}")]
    Configuration(String),
    #[error("Model Prediction Error: {0}")]
    ModelPrediction(String),
    #[error("Unknown label index {index} (encoder has {classes} classes)")]
    UnknownLabel { index: usize, classes: usize },
    #[error("Render Error: {0}")]
    Render(String),
    #[error("Internal Error: {0}")]
    Internal(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Ndarray Error: {0}")]
    Ndarray(#[from] ndarray::ShapeError),
}

impl AdrError {
    /// True for errors that should abort startup rather than fail a single request.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            AdrError::MissingArtifact(_) | AdrError::MissingColumn(_) | AdrError::Configuration(_)
        )
    }
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, AdrError>;
