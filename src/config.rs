// src/config.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::Result;

/// Which attribution vector the explain step visualizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationMode {
    /// KernelSHAP of the predicted reaction probability for the actual input.
    #[default]
    Live,
    /// First row of the attribution matrix stored at training time, whatever the input.
    Precomputed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    pub mode: ExplanationMode,
    /// Upper bound on background rows fed to KernelSHAP.
    pub max_background_rows: usize,
    pub seed: u64,
    /// Std-dev of Gaussian noise on masked features when the background is a single row.
    pub noise_std_dev: f64,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            mode: ExplanationMode::Live,
            max_background_rows: 100,
            seed: 42,
            noise_std_dev: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub plot_path: PathBuf,
    pub plot_width: u32,
    pub plot_height: u32,
    pub explanation: ExplanationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            dataset_path: PathBuf::from("data/neonatal_adr.csv"),
            plot_path: PathBuf::from("static/xai_plot.svg"),
            plot_width: 800,
            plot_height: 500,
            explanation: ExplanationConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
