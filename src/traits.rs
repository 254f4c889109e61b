// src/traits.rs
use crate::core::{Dataset, FeatureRow, Result};
use ndarray::Array1;

/// A model producing one scalar output per row, the shape KernelSHAP explains.
pub trait PredictModel {
    fn predict(&self, instances: &Dataset) -> Result<Array1<f64>>;
    fn num_features(&self) -> usize;
}

/// A trained multiclass classifier.
pub trait Classifier: Send + Sync {
    /// Class probabilities for each row, shape `(rows, num_classes)`.
    fn predict_proba(&self, instances: &Dataset) -> Result<Dataset>;

    fn num_features(&self) -> usize;

    fn num_classes(&self) -> usize;

    /// Arg-max class and the full distribution for a single row.
    fn predict_row(&self, row: &FeatureRow) -> Result<(usize, Array1<f64>)> {
        let proba = self.predict_proba(&row.as_dataset())?;
        let dist = proba.row(0).to_owned();
        let class = crate::utils::argmax(dist.view()).ok_or_else(|| {
            crate::core::AdrError::ModelPrediction("Classifier returned no classes.".to_string())
        })?;
        Ok((class, dist))
    }
}

/// Adapts one class's probability of a [`Classifier`] to [`PredictModel`].
pub struct ClassProbability<'a, C: Classifier + ?Sized> {
    classifier: &'a C,
    class: usize,
}

impl<'a, C: Classifier + ?Sized> ClassProbability<'a, C> {
    pub fn new(classifier: &'a C, class: usize) -> Self {
        ClassProbability { classifier, class }
    }
}

impl<C: Classifier + ?Sized> PredictModel for ClassProbability<'_, C> {
    fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
        let proba = self.classifier.predict_proba(instances)?;
        if self.class >= proba.ncols() {
            return Err(crate::core::AdrError::ModelPrediction(format!(
                "Class {} out of range for {} classes.",
                self.class,
                proba.ncols()
            )));
        }
        Ok(proba.column(self.class).to_owned())
    }

    fn num_features(&self) -> usize {
        self.classifier.num_features()
    }
}
