// src/algorithms/tree_ensemble.rs

//! Gradient-boosted multiclass tree ensemble, evaluated from an exported
//! JSON artifact.

use serde::{Deserialize, Serialize};

use crate::core::{AdrError, Dataset, Result, FEATURE_COLUMNS};
use crate::traits::Classifier;
use crate::utils::softmax;
use ndarray::{Array1, ArrayView1};

/// One node of a tree. Children are indices into the tree's node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_left")]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

fn default_left() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Output class this tree contributes to.
    pub group: usize,
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf value reached by `features`. Goes left on `x < threshold`;
    /// NaN follows the node's default direction.
    pub(crate) fn predict_row(&self, features: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = features[*feature];
                    let go_left = if x.is_nan() { *default_left } else { x < *threshold };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }

    fn validate(&self, tree_idx: usize, n_features: usize, n_classes: usize) -> Result<()> {
        let bad = |msg: String| AdrError::Configuration(format!("Tree {}: {}", tree_idx, msg));
        if self.nodes.is_empty() {
            return Err(bad("tree has no nodes".to_string()));
        }
        if self.group >= n_classes {
            return Err(bad(format!(
                "group {} out of range for {} classes",
                self.group, n_classes
            )));
        }
        let n_nodes = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(bad(format!("node {} splits on feature {}", i, feature)));
                }
                if threshold.is_nan() {
                    return Err(bad(format!("node {} has a NaN threshold", i)));
                }
                // Children strictly after their parent keeps every tree acyclic.
                for child in [*left, *right] {
                    if child <= i || child >= n_nodes {
                        return Err(bad(format!("node {} has invalid child {}", i, child)));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Multiclass gradient-boosted trees with softmax output.
///
/// Only constructed through [`GradientBoostedClassifier::new`] or
/// deserialization, both of which validate the structure, so prediction never
/// indexes outside a tree or a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClassifierFile", into = "ClassifierFile")]
pub struct GradientBoostedClassifier {
    feature_names: Vec<String>,
    n_classes: usize,
    base_score: Vec<f64>,
    trees: Vec<Tree>,
}

/// On-disk layout of an exported model.
#[derive(Serialize, Deserialize)]
struct ClassifierFile {
    feature_names: Vec<String>,
    n_classes: usize,
    base_score: Vec<f64>,
    trees: Vec<Tree>,
}

impl TryFrom<ClassifierFile> for GradientBoostedClassifier {
    type Error = String;

    fn try_from(file: ClassifierFile) -> std::result::Result<Self, Self::Error> {
        GradientBoostedClassifier::new(file.feature_names, file.n_classes, file.base_score, file.trees)
            .map_err(|e| e.to_string())
    }
}

impl From<GradientBoostedClassifier> for ClassifierFile {
    fn from(model: GradientBoostedClassifier) -> Self {
        ClassifierFile {
            feature_names: model.feature_names,
            n_classes: model.n_classes,
            base_score: model.base_score,
            trees: model.trees,
        }
    }
}

impl GradientBoostedClassifier {
    pub fn new(
        feature_names: Vec<String>,
        n_classes: usize,
        base_score: Vec<f64>,
        trees: Vec<Tree>,
    ) -> Result<Self> {
        let model = GradientBoostedClassifier {
            feature_names,
            n_classes,
            base_score,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check structure and that the feature order matches the training schema.
    fn validate(&self) -> Result<()> {
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_COLUMNS.iter().copied()) {
            return Err(AdrError::Configuration(format!(
                "Model was trained on columns {:?}, expected {:?}.",
                self.feature_names, FEATURE_COLUMNS
            )));
        }
        if self.n_classes == 0 {
            return Err(AdrError::Configuration("Model has no classes.".to_string()));
        }
        if self.base_score.len() != self.n_classes {
            return Err(AdrError::Configuration(format!(
                "base_score has {} entries for {} classes.",
                self.base_score.len(),
                self.n_classes
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.feature_names.len(), self.n_classes)?;
        }
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Per-class margin (base score plus leaf sums) for one row.
    ///
    /// `features` must have [`Classifier::num_features`] entries.
    pub fn raw_scores(&self, features: ArrayView1<f64>) -> Array1<f64> {
        let mut out = Array1::from_vec(self.base_score.clone());
        for tree in &self.trees {
            out[tree.group] += tree.predict_row(features);
        }
        out
    }
}

impl Classifier for GradientBoostedClassifier {
    fn predict_proba(&self, instances: &Dataset) -> Result<Dataset> {
        if instances.ncols() != self.feature_names.len() {
            return Err(AdrError::IncompatibleDimensions(format!(
                "Model expects {} features, got {}.",
                self.feature_names.len(),
                instances.ncols()
            )));
        }
        let mut out = Dataset::zeros((instances.nrows(), self.n_classes));
        for (row, mut dst) in instances.rows().into_iter().zip(out.rows_mut()) {
            let proba = softmax(self.raw_scores(row).view());
            if proba.iter().any(|p| !p.is_finite()) {
                return Err(AdrError::ModelPrediction(
                    "Non-finite class probability.".to_string(),
                ));
            }
            dst.assign(&proba);
        }
        Ok(out)
    }

    fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    fn num_classes(&self) -> usize {
        self.n_classes
    }
}
