mod common;

use neonatal_adr::algorithms::tree_ensemble::GradientBoostedClassifier;
use neonatal_adr::core::{FeatureRow, AGE, PRODUCT, WEIGHT};
use neonatal_adr::{AdrPipeline, CategoricalEncoder, Classifier, ExplanationMode, RawRecord};
use proptest::prelude::*;

fn reaction_model(dir: &std::path::Path) -> GradientBoostedClassifier {
    let text = std::fs::read_to_string(dir.join("reaction_model.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

proptest! {
    #[test]
    fn known_values_round_trip(values in prop::collection::vec("[A-Za-z ]{1,12}", 1..20)) {
        let enc = CategoricalEncoder::fit(&values);
        for v in &values {
            let code = enc.transform(v).unwrap();
            prop_assert_eq!(enc.inverse_transform(code).unwrap(), v.as_str());
        }
    }

    #[test]
    fn unseen_values_grow_idempotently(
        known in prop::collection::vec("[a-m]{1,6}", 1..10),
        fresh in "[n-z]{1,6}",
    ) {
        let mut enc = CategoricalEncoder::fit(&known);
        let before = enc.len();
        let first = enc.encode(&fresh);
        let second = enc.encode(&fresh);
        prop_assert_eq!(first, before);
        prop_assert_eq!(first, second);
        prop_assert_eq!(enc.len(), before + 1);
    }

    #[test]
    fn non_numeric_age_and_weight_become_zero(age in "[a-z]{1,8}", weight in "[a-z]{1,8}") {
        let dir = tempfile::tempdir().unwrap();
        common::write_artifacts(dir.path());
        let pipeline = AdrPipeline::load(&common::config(dir.path(), ExplanationMode::Precomputed)).unwrap();
        // Words like "inf" and "nan" are valid floats; keep to ones that are not.
        prop_assume!(age.parse::<f64>().is_err() && weight.parse::<f64>().is_err());
        let row = pipeline
            .assemble(&RawRecord::new("Paracetamol", "Fever", "M", age, weight))
            .unwrap();
        prop_assert_eq!(row.get(AGE), Some(0.0));
        prop_assert_eq!(row.get(WEIGHT), Some(0.0));
        prop_assert_eq!(row.get(PRODUCT), Some(2.0));
    }

    #[test]
    fn confidence_stays_in_percent_range_and_is_repeatable(
        product in 0u8..6, reason in 0u8..6, sex in 0u8..3,
        age in -10.0f64..400.0, weight in 0.0f64..8.0,
    ) {
        let dir = tempfile::tempdir().unwrap();
        common::write_artifacts(dir.path());
        let model = reaction_model(dir.path());
        let row = FeatureRow::from_values(vec![
            product as f64, reason as f64, sex as f64, age, weight,
        ]).unwrap();
        let (class, dist) = model.predict_row(&row).unwrap();
        let confidence = dist[class] * 100.0;
        prop_assert!((0.0..=100.0).contains(&confidence));
        let (again, dist2) = model.predict_row(&row).unwrap();
        prop_assert_eq!(class, again);
        prop_assert_eq!(dist, dist2);
    }
}
