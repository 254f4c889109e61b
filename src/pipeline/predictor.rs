// src/pipeline/predictor.rs
use crate::core::{AdrError, ClassPrediction, FeatureRow, Result};
use crate::encoding::EncoderRegistry;
use crate::traits::Classifier;

/// The reaction and outcome classifiers.
pub struct Predictor {
    reaction: Box<dyn Classifier>,
    outcome: Box<dyn Classifier>,
}

impl Predictor {
    pub fn new(reaction: Box<dyn Classifier>, outcome: Box<dyn Classifier>) -> Self {
        Predictor { reaction, outcome }
    }

    pub fn reaction_model(&self) -> &dyn Classifier {
        self.reaction.as_ref()
    }

    pub fn outcome_model(&self) -> &dyn Classifier {
        self.outcome.as_ref()
    }

    /// Reaction and outcome predictions, labels decoded through `registry`.
    pub fn predict(
        &self,
        row: &FeatureRow,
        registry: &EncoderRegistry,
    ) -> Result<(ClassPrediction, ClassPrediction)> {
        let (reaction_idx, reaction_conf) = classify(self.reaction.as_ref(), row)?;
        let (outcome_idx, outcome_conf) = classify(self.outcome.as_ref(), row)?;
        Ok((
            ClassPrediction {
                label: registry.decode_reaction(reaction_idx)?.to_string(),
                class_index: reaction_idx,
                confidence: reaction_conf,
            },
            ClassPrediction {
                label: registry.decode_outcome(outcome_idx)?.to_string(),
                class_index: outcome_idx,
                confidence: outcome_conf,
            },
        ))
    }
}

/// Predicted class and its probability as a percentage.
fn classify(model: &dyn Classifier, row: &FeatureRow) -> Result<(usize, f64)> {
    if row.len() != model.num_features() {
        return Err(AdrError::IncompatibleDimensions(format!(
            "Feature row has {} columns, classifier expects {}.",
            row.len(),
            model.num_features()
        )));
    }
    let (class, dist) = model.predict_row(row)?;
    let top = dist[class];
    Ok((class, (top * 100.0).clamp(0.0, 100.0)))
}
