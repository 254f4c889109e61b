// src/pipeline/assembler.rs
use log::debug;

use crate::core::{FeatureRow, RawRecord, Result, AGE, PRODUCT, REASON, SEX, WEIGHT};
use crate::encoding::EncoderRegistry;
use crate::utils::coerce_numeric;

/// Turns a raw form record into a classifier-ready [`FeatureRow`].
///
/// Never rejects user input: unseen categorical values are added to the
/// registry's vocabulary, unparseable numbers become 0. Categorical values are
/// trimmed the same way dataset cells are.
pub struct FeatureAssembler<'a> {
    registry: &'a EncoderRegistry,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(registry: &'a EncoderRegistry) -> Self {
        FeatureAssembler { registry }
    }

    pub fn assemble(&self, record: &RawRecord) -> Result<FeatureRow> {
        let product = self.registry.encode(PRODUCT, record.product.trim())?;
        let reason = self.registry.encode(REASON, record.reason.trim())?;
        let sex = self.registry.encode(SEX, record.sex.trim())?;
        let age = numeric(AGE, &record.age);
        let weight = numeric(WEIGHT, &record.weight);
        FeatureRow::from_values(vec![
            product as f64,
            reason as f64,
            sex as f64,
            age,
            weight,
        ])
    }
}

fn numeric(column: &str, raw: &str) -> f64 {
    let value = coerce_numeric(raw);
    if value == 0.0 && raw.trim().parse::<f64>().is_err() {
        debug!("Coerced unparseable {} '{}' to 0", column, raw);
    }
    value
}
