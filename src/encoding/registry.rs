// src/encoding/registry.rs
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::CategoricalEncoder;
use crate::core::{AdrError, Result, CATEGORICAL_COLUMNS};
use crate::io::artifacts::{self, LABEL_ENCODERS, LE_Y_OUTCOME, LE_Y_REACTION};
use crate::io::dataset::AdrDataset;

/// Encoders for every categorical input column plus both target columns.
///
/// Feature vocabularies may grow at inference time and sit behind a single
/// writer lock; target encoders are read-only once built.
#[derive(Debug)]
pub struct EncoderRegistry {
    features: RwLock<HashMap<String, CategoricalEncoder>>,
    reaction: CategoricalEncoder,
    outcome: CategoricalEncoder,
}

impl EncoderRegistry {
    pub fn new(
        features: HashMap<String, CategoricalEncoder>,
        reaction: CategoricalEncoder,
        outcome: CategoricalEncoder,
    ) -> Result<Self> {
        for col in CATEGORICAL_COLUMNS {
            if !features.contains_key(col) {
                return Err(AdrError::Configuration(format!(
                    "No encoder for categorical column '{}'.",
                    col
                )));
            }
        }
        if reaction.is_empty() || outcome.is_empty() {
            return Err(AdrError::Configuration(
                "Target encoders must know at least one label.".to_string(),
            ));
        }
        Ok(EncoderRegistry {
            features: RwLock::new(features),
            reaction,
            outcome,
        })
    }

    /// Fit fresh encoders over the dataset rows that have every required field.
    pub fn fit(dataset: &AdrDataset) -> Result<Self> {
        let records = dataset.complete_records();
        if records.is_empty() {
            return Err(AdrError::InvalidInput(
                "Dataset has no complete rows to fit encoders on.".to_string(),
            ));
        }
        let mut features = HashMap::new();
        features.insert(
            CATEGORICAL_COLUMNS[0].to_string(),
            CategoricalEncoder::fit(records.iter().map(|r| r.product.as_str())),
        );
        features.insert(
            CATEGORICAL_COLUMNS[1].to_string(),
            CategoricalEncoder::fit(records.iter().map(|r| r.reason.as_str())),
        );
        features.insert(
            CATEGORICAL_COLUMNS[2].to_string(),
            CategoricalEncoder::fit(records.iter().map(|r| r.sex.as_str())),
        );
        let reaction = CategoricalEncoder::fit(records.iter().map(|r| r.reaction.as_str()));
        let outcome = CategoricalEncoder::fit(records.iter().map(|r| r.outcome.as_str()));
        info!(
            "Fitted encoders on {} rows ({} reactions, {} outcomes)",
            records.len(),
            reaction.len(),
            outcome.len()
        );
        Self::new(features, reaction, outcome)
    }

    /// Encode a categorical value, growing the column's vocabulary if unseen.
    pub fn encode(&self, feature: &str, value: &str) -> Result<usize> {
        {
            let features = self.features.read();
            let enc = features.get(feature).ok_or_else(|| missing(feature))?;
            if let Some(code) = enc.transform(value) {
                return Ok(code);
            }
        }
        let mut features = self.features.write();
        let enc = features.get_mut(feature).ok_or_else(|| missing(feature))?;
        let before = enc.len();
        let code = enc.encode(value);
        if enc.len() > before {
            info!(
                "Unseen value '{}' for '{}' added to vocabulary as {}",
                value, feature, code
            );
        }
        Ok(code)
    }

    /// Look up a value without growing the vocabulary.
    pub fn transform(&self, feature: &str, value: &str) -> Result<Option<usize>> {
        let features = self.features.read();
        let enc = features.get(feature).ok_or_else(|| missing(feature))?;
        Ok(enc.transform(value))
    }

    pub fn decode_feature(&self, feature: &str, code: usize) -> Result<String> {
        let features = self.features.read();
        let enc = features.get(feature).ok_or_else(|| missing(feature))?;
        enc.inverse_transform(code).map(str::to_string)
    }

    pub fn vocabulary_len(&self, feature: &str) -> Result<usize> {
        let features = self.features.read();
        features
            .get(feature)
            .map(CategoricalEncoder::len)
            .ok_or_else(|| missing(feature))
    }

    pub fn decode_reaction(&self, code: usize) -> Result<&str> {
        self.reaction.inverse_transform(code)
    }

    pub fn decode_outcome(&self, code: usize) -> Result<&str> {
        self.outcome.inverse_transform(code)
    }

    pub fn reaction_encoder(&self) -> &CategoricalEncoder {
        &self.reaction
    }

    pub fn outcome_encoder(&self) -> &CategoricalEncoder {
        &self.outcome
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let features: HashMap<String, CategoricalEncoder> =
            artifacts::read_json(&dir.join(LABEL_ENCODERS))?;
        let reaction: CategoricalEncoder = artifacts::read_json(&dir.join(LE_Y_REACTION))?;
        let outcome: CategoricalEncoder = artifacts::read_json(&dir.join(LE_Y_OUTCOME))?;
        debug!("Loaded {} feature encoders from {}", features.len(), dir.display());
        Self::new(features, reaction, outcome)
    }

    /// Write the encoder artifacts, as `fit-encoders` does after fitting on the dataset.
    ///
    /// Serving never calls this: vocabulary grown by requests lives in memory
    /// only and is gone after a reload.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let features: BTreeMap<String, CategoricalEncoder> = self
            .features
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        artifacts::write_json(&dir.join(LABEL_ENCODERS), &features)?;
        artifacts::write_json(&dir.join(LE_Y_REACTION), &self.reaction)?;
        artifacts::write_json(&dir.join(LE_Y_OUTCOME), &self.outcome)?;
        Ok(())
    }
}

fn missing(feature: &str) -> AdrError {
    AdrError::Configuration(format!("No encoder registered for '{}'.", feature))
}
