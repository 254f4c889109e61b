// src/core/data.rs
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::errors::{AdrError, Result};

/// A single numeric row of features.
pub type Instance = Array1<f64>;

/// Multiple numeric rows, e.g. explanation background data.
pub type Dataset = Array2<f64>;

pub const PRODUCT: &str = "suspect_product_active_ingredients";
pub const REASON: &str = "reason_for_use";
pub const SEX: &str = "sex";
pub const AGE: &str = "patient_age";
pub const WEIGHT: &str = "patient_weight";

/// Column order the classifiers were trained on.
pub const FEATURE_COLUMNS: [&str; 5] = [PRODUCT, REASON, SEX, AGE, WEIGHT];

/// The label-encoded subset of [`FEATURE_COLUMNS`].
pub const CATEGORICAL_COLUMNS: [&str; 3] = [PRODUCT, REASON, SEX];

/// Numeric subset of [`FEATURE_COLUMNS`].
pub const NUMERIC_COLUMNS: [&str; 2] = [AGE, WEIGHT];

/// One human-entered request, every field as typed into the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub product: String,
    pub reason: String,
    pub sex: String,
    pub age: String,
    pub weight: String,
}

impl RawRecord {
    pub fn new(
        product: impl Into<String>,
        reason: impl Into<String>,
        sex: impl Into<String>,
        age: impl Into<String>,
        weight: impl Into<String>,
    ) -> Self {
        RawRecord {
            product: product.into(),
            reason: reason.into(),
            sex: sex.into(),
            age: age.into(),
            weight: weight.into(),
        }
    }

    /// Raw value of a column in [`FEATURE_COLUMNS`].
    pub fn field(&self, column: &str) -> Option<&str> {
        match column {
            PRODUCT => Some(&self.product),
            REASON => Some(&self.reason),
            SEX => Some(&self.sex),
            AGE => Some(&self.age),
            WEIGHT => Some(&self.weight),
            _ => None,
        }
    }
}

/// Encoded, fixed-schema row fed to the classifiers.
///
/// Values are stored in [`FEATURE_COLUMNS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Instance,
}

impl FeatureRow {
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.len() != FEATURE_COLUMNS.len() {
            return Err(AdrError::IncompatibleDimensions(format!(
                "Feature row has {} values, expected {}.",
                values.len(),
                FEATURE_COLUMNS.len()
            )));
        }
        Ok(FeatureRow {
            values: Instance::from(values),
        })
    }

    pub fn values(&self) -> &Instance {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|idx| self.values[idx])
    }

    /// The row as a 1×N matrix.
    pub fn as_dataset(&self) -> Dataset {
        self.values.view().insert_axis(Axis(0)).to_owned()
    }

    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }
}

/// One classifier's decoded output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassPrediction {
    pub label: String,
    pub class_index: usize,
    /// Maximum class probability as a percentage.
    pub confidence: f64,
}

/// A single feature's attribution toward the reaction prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub value: f64,
}

/// Everything a request produces.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub reaction: ClassPrediction,
    pub outcome: ClassPrediction,
    /// Ordered by ascending absolute value.
    pub contributions: Vec<FeatureContribution>,
    pub plot_path: PathBuf,
}

impl fmt::Display for PredictionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Prediction:")?;
        writeln!(
            f,
            "  Reaction: {} ({:.2}%)",
            self.reaction.label, self.reaction.confidence
        )?;
        writeln!(
            f,
            "  Outcome:  {} ({:.2}%)",
            self.outcome.label, self.outcome.confidence
        )?;
        writeln!(f, "  Feature contributions (smallest first):")?;
        for c in &self.contributions {
            writeln!(f, "    {:<36} {:+.4}", c.feature, c.value)?;
        }
        write!(f, "  Plot: {}", self.plot_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_row_rejects_wrong_length() {
        let err = FeatureRow::from_values(vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, AdrError::IncompatibleDimensions(_)));
    }

    #[test]
    fn feature_row_lookup_by_column() {
        let row = FeatureRow::from_values(vec![3.0, 1.0, 0.0, 10.0, 3.2]).unwrap();
        assert_eq!(row.get(AGE), Some(10.0));
        assert_eq!(row.get(WEIGHT), Some(3.2));
        assert_eq!(row.get("reactions"), None);
        assert_eq!(row.as_dataset().dim(), (1, 5));
        assert!(!row.has_missing());
    }

    #[test]
    fn raw_record_fields_follow_column_names() {
        let rec = RawRecord::new("Paracetamol", "Fever", "M", "10", "3.2");
        let fields: Vec<_> = FEATURE_COLUMNS
            .iter()
            .map(|c| rec.field(c).unwrap())
            .collect();
        assert_eq!(fields, vec!["Paracetamol", "Fever", "M", "10", "3.2"]);
    }
}
