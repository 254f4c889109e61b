// src/pipeline/explainer.rs
use log::{info, warn};
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::algorithms::{KernelExplainer, KernelShapConfig};
use crate::config::{ExplanationConfig, ExplanationMode};
use crate::core::{AdrError, Dataset, FeatureContribution, FeatureRow, Result, FEATURE_COLUMNS};
use crate::io::artifacts::{self, XAI_OUTCOME, XAI_REACTION};
use crate::traits::{ClassProbability, Classifier};

/// Attribution values computed at training time, plus the background rows
/// used to compute fresh ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationStructure {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub expected_value: f64,
    /// One attribution vector per training row.
    pub attributions: Vec<Vec<f64>>,
    /// Encoded training rows.
    #[serde(default)]
    pub background: Vec<Vec<f64>>,
}

impl ExplanationStructure {
    /// The declared feature count must match the live row width exactly.
    pub fn validate(&self) -> Result<()> {
        if self
            .feature_names
            .iter()
            .map(String::as_str)
            .ne(FEATURE_COLUMNS.iter().copied())
        {
            return Err(AdrError::Configuration(format!(
                "Explanation covers {:?}, expected {:?}.",
                self.feature_names, FEATURE_COLUMNS
            )));
        }
        let width = self.feature_names.len();
        for (what, rows) in [("attribution", &self.attributions), ("background", &self.background)] {
            if let Some(i) = rows.iter().position(|r| r.len() != width) {
                return Err(AdrError::Configuration(format!(
                    "{} row {} has {} values for {} features.",
                    what,
                    i,
                    rows[i].len(),
                    width
                )));
            }
        }
        Ok(())
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn background_matrix(&self) -> Result<Dataset> {
        to_matrix(&self.background, self.num_features())
    }

    /// Replace the background rows with an encoded feature matrix.
    pub fn set_background(&mut self, data: &Dataset) -> Result<()> {
        if data.ncols() != self.num_features() {
            return Err(AdrError::IncompatibleDimensions(format!(
                "Background has {} columns, explanation covers {} features.",
                data.ncols(),
                self.num_features()
            )));
        }
        self.background = data.rows().into_iter().map(|r| r.to_vec()).collect();
        Ok(())
    }
}

/// Rewrite the background of whichever explanation artifacts exist in `dir`.
///
/// Returns how many files were updated; absent files are left absent.
pub fn refresh_backgrounds(dir: &Path, background: &Dataset) -> Result<usize> {
    let mut updated = 0;
    for name in [XAI_REACTION, XAI_OUTCOME] {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        let mut structure: ExplanationStructure = artifacts::read_json(&path)?;
        structure.set_background(background)?;
        structure.validate()?;
        artifacts::write_json(&path, &structure)?;
        info!("Wrote {} background rows to {}", background.nrows(), path.display());
        updated += 1;
    }
    Ok(updated)
}

fn to_matrix(rows: &[Vec<f64>], width: usize) -> Result<Dataset> {
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(Dataset::from_shape_vec((rows.len(), width), flat)?)
}

/// Produces the ranked reaction contributions for a request.
#[derive(Debug)]
pub struct Explainer {
    structure: ExplanationStructure,
    background: Dataset,
    config: ExplanationConfig,
}

impl Explainer {
    pub fn new(structure: ExplanationStructure, config: ExplanationConfig) -> Result<Self> {
        structure.validate()?;
        match config.mode {
            ExplanationMode::Live if structure.background.is_empty() => {
                return Err(AdrError::Configuration(
                    "Live explanations need background rows in the explanation artifact."
                        .to_string(),
                ))
            }
            ExplanationMode::Precomputed if structure.attributions.is_empty() => {
                return Err(AdrError::Configuration(
                    "Explanation artifact has no precomputed attributions.".to_string(),
                ))
            }
            _ => {}
        }
        let background = subsample(structure.background_matrix()?, config.max_background_rows);
        Ok(Explainer {
            structure,
            background,
            config,
        })
    }

    pub fn mode(&self) -> ExplanationMode {
        self.config.mode
    }

    pub fn structure(&self) -> &ExplanationStructure {
        &self.structure
    }

    /// Raw attribution vector, in [`FEATURE_COLUMNS`] order.
    pub fn attributions(
        &self,
        classifier: &dyn Classifier,
        row: &FeatureRow,
        class: usize,
    ) -> Result<Array1<f64>> {
        match self.config.mode {
            ExplanationMode::Precomputed => {
                warn!("Explaining with the stored first-row attributions, not the request input");
                Ok(Array1::from(self.structure.attributions[0].clone()))
            }
            ExplanationMode::Live => {
                let model = ClassProbability::new(classifier, class);
                let shap_config = KernelShapConfig {
                    seed: self.config.seed,
                    noise_std_dev: self.config.noise_std_dev,
                    ..KernelShapConfig::default()
                };
                let explainer =
                    KernelExplainer::new(model, self.background.clone(), Some(shap_config))?;
                Ok(explainer.shap_values(row.values())?.shap_values)
            }
        }
    }

    /// Contributions ordered by ascending magnitude.
    pub fn contributions(
        &self,
        classifier: &dyn Classifier,
        row: &FeatureRow,
        class: usize,
    ) -> Result<Vec<FeatureContribution>> {
        let values = self.attributions(classifier, row, class)?;
        Ok(rank_contributions(&self.structure.feature_names, &values))
    }
}

/// Pair names with values and sort by ascending absolute value (stable).
pub fn rank_contributions(names: &[String], values: &Array1<f64>) -> Vec<FeatureContribution> {
    let mut out: Vec<FeatureContribution> = names
        .iter()
        .zip(values.iter())
        .map(|(feature, &value)| FeatureContribution {
            feature: feature.clone(),
            value,
        })
        .collect();
    out.sort_by(|a, b| a.value.abs().total_cmp(&b.value.abs()));
    out
}

/// Keep at most `max_rows` rows, evenly spaced.
fn subsample(data: Dataset, max_rows: usize) -> Dataset {
    let n = data.nrows();
    if max_rows == 0 || n <= max_rows {
        return data;
    }
    let picks: Vec<usize> = (0..max_rows).map(|i| i * n / max_rows).collect();
    data.select(Axis(0), &picks)
}
