// src/lib.rs

//! `neonatal_adr` predicts the likely adverse-drug-reaction and outcome
//! categories for a neonatal patient from a suspect product, reason for use,
//! sex, age and weight, and explains the reaction prediction with per-feature
//! SHAP values.
//!
//! ```no_run
//! use neonatal_adr::{AdrPipeline, AppConfig, RawRecord};
//!
//! # fn main() -> neonatal_adr::Result<()> {
//! let pipeline = AdrPipeline::load(&AppConfig::default())?;
//! let report = pipeline.handle(&RawRecord::new("Paracetamol", "Fever", "M", "10", "3.2"))?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod config;
pub mod core;
pub mod encoding;
pub mod io;
pub mod pipeline;
pub mod plot;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{GradientBoostedClassifier, KernelExplainer};
pub use crate::config::{AppConfig, ExplanationMode};
pub use crate::core::{
    AdrError, ClassPrediction, FeatureContribution, FeatureRow, PredictionReport, RawRecord, Result,
};
pub use crate::encoding::{CategoricalEncoder, EncoderRegistry};
pub use crate::io::AdrDataset;
pub use crate::pipeline::{AdrPipeline, ExplanationStructure};
pub use crate::traits::{Classifier, PredictModel};
