//! Request handling: assemble the feature row, predict, explain.

pub mod assembler;
pub mod explainer;
pub mod predictor;

pub use assembler::FeatureAssembler;
pub use explainer::{rank_contributions, refresh_backgrounds, Explainer, ExplanationStructure};
pub use predictor::Predictor;

use log::info;
use std::path::{Path, PathBuf};

use crate::algorithms::GradientBoostedClassifier;
use crate::config::AppConfig;
use crate::core::{
    AdrError, ClassPrediction, FeatureContribution, FeatureRow, PredictionReport, RawRecord,
    Result,
};
use crate::encoding::{CategoricalEncoder, EncoderRegistry};
use crate::io::artifacts::{self, OUTCOME_MODEL, REACTION_MODEL, XAI_OUTCOME, XAI_REACTION};
use crate::plot::render_contributions;
use crate::traits::Classifier;

/// Everything needed to answer requests, loaded once at startup.
pub struct AdrPipeline {
    registry: EncoderRegistry,
    predictor: Predictor,
    explainer: Explainer,
    outcome_explanation: ExplanationStructure,
    plot_path: PathBuf,
    plot_size: (u32, u32),
}

impl AdrPipeline {
    /// Load every artifact from `config.model_dir`. Any missing or
    /// inconsistent artifact is an error here, never at request time.
    pub fn load(config: &AppConfig) -> Result<Self> {
        let dir = config.model_dir.as_path();
        artifacts::require(dir)?;

        let registry = EncoderRegistry::load(dir)?;
        let reaction: GradientBoostedClassifier = artifacts::read_json(&dir.join(REACTION_MODEL))?;
        let outcome: GradientBoostedClassifier = artifacts::read_json(&dir.join(OUTCOME_MODEL))?;
        let xai_reaction: ExplanationStructure = artifacts::read_json(&dir.join(XAI_REACTION))?;
        let xai_outcome: ExplanationStructure = artifacts::read_json(&dir.join(XAI_OUTCOME))?;

        let pipeline = Self::from_parts(registry, reaction, outcome, xai_reaction, xai_outcome, config)?;
        info!("Loaded models from {}", dir.display());
        Ok(pipeline)
    }

    pub fn from_parts(
        registry: EncoderRegistry,
        reaction: GradientBoostedClassifier,
        outcome: GradientBoostedClassifier,
        xai_reaction: ExplanationStructure,
        xai_outcome: ExplanationStructure,
        config: &AppConfig,
    ) -> Result<Self> {
        check_targets("reaction", registry.reaction_encoder(), &reaction)?;
        check_targets("outcome", registry.outcome_encoder(), &outcome)?;
        xai_outcome.validate()?;
        let explainer = Explainer::new(xai_reaction, config.explanation.clone())?;

        Ok(AdrPipeline {
            registry,
            predictor: Predictor::new(Box::new(reaction), Box::new(outcome)),
            explainer,
            outcome_explanation: xai_outcome,
            plot_path: config.plot_path.clone(),
            plot_size: (config.plot_width, config.plot_height),
        })
    }

    pub fn registry(&self) -> &EncoderRegistry {
        &self.registry
    }

    pub fn explainer(&self) -> &Explainer {
        &self.explainer
    }

    pub fn outcome_explanation(&self) -> &ExplanationStructure {
        &self.outcome_explanation
    }

    pub fn assemble(&self, record: &RawRecord) -> Result<FeatureRow> {
        FeatureAssembler::new(&self.registry).assemble(record)
    }

    pub fn predict(&self, row: &FeatureRow) -> Result<(ClassPrediction, ClassPrediction)> {
        self.predictor.predict(row, &self.registry)
    }

    /// Rank the reaction contributions and render them to `path`.
    pub fn explain_to(
        &self,
        row: &FeatureRow,
        reaction_class: usize,
        path: &Path,
    ) -> Result<(Vec<FeatureContribution>, PathBuf)> {
        let contributions =
            self.explainer
                .contributions(self.predictor.reaction_model(), row, reaction_class)?;
        render_contributions(&contributions, path, self.plot_size)?;
        Ok((contributions, path.to_path_buf()))
    }

    pub fn explain(
        &self,
        row: &FeatureRow,
        reaction_class: usize,
    ) -> Result<(Vec<FeatureContribution>, PathBuf)> {
        self.explain_to(row, reaction_class, &self.plot_path)
    }

    pub fn handle(&self, record: &RawRecord) -> Result<PredictionReport> {
        let row = self.assemble(record)?;
        let (reaction, outcome) = self.predict(&row)?;
        let (contributions, plot_path) = self.explain(&row, reaction.class_index)?;
        info!(
            "Predicted reaction '{}' ({:.2}%), outcome '{}' ({:.2}%)",
            reaction.label, reaction.confidence, outcome.label, outcome.confidence
        );
        Ok(PredictionReport {
            reaction,
            outcome,
            contributions,
            plot_path,
        })
    }
}

fn check_targets(
    target: &str,
    encoder: &CategoricalEncoder,
    model: &GradientBoostedClassifier,
) -> Result<()> {
    if encoder.len() < model.num_classes() {
        return Err(AdrError::Configuration(format!(
            "The {} model has {} classes but its label encoder knows {}.",
            target,
            model.num_classes(),
            encoder.len()
        )));
    }
    Ok(())
}
