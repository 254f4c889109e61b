//! Persisted artifacts and the dataset file.

pub mod artifacts;
pub mod dataset;

pub use dataset::{AdrDataset, DatasetRecord};
