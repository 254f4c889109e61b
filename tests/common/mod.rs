#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::Path;

use neonatal_adr::{AppConfig, ExplanationMode};

pub const FEATURES: [&str; 5] = [
    "suspect_product_active_ingredients",
    "reason_for_use",
    "sex",
    "patient_age",
    "patient_weight",
];

fn split(feature: usize, threshold: f64) -> Value {
    json!({"kind": "split", "feature": feature, "threshold": threshold, "left": 1, "right": 2})
}

fn stump(group: usize, feature: usize, threshold: f64, left: f64, right: f64) -> Value {
    json!({"group": group, "nodes": [
        split(feature, threshold),
        {"kind": "leaf", "value": left},
        {"kind": "leaf", "value": right}
    ]})
}

/// Reaction classes: Jaundice, Rash, Tachycardia (sorted label order).
fn reaction_model() -> Value {
    json!({
        "feature_names": FEATURES,
        "n_classes": 3,
        "base_score": [0.0, 0.0, 0.0],
        "trees": [
            stump(1, 0, 1.5, -0.4, 0.9),
            stump(0, 3, 5.0, 0.7, -0.3),
            stump(2, 4, 2.0, 0.6, -0.2),
            stump(1, 1, 0.5, -0.1, 0.3),
            {"group": 2, "nodes": [
                split(2, 0.5),
                {"kind": "split", "feature": 3, "threshold": 20.0, "left": 3, "right": 4},
                {"kind": "leaf", "value": 0.1},
                {"kind": "leaf", "value": -0.2},
                {"kind": "leaf", "value": 0.4}
            ]}
        ]
    })
}

/// Outcome classes: Hospitalised, Recovered.
fn outcome_model() -> Value {
    json!({
        "feature_names": FEATURES,
        "n_classes": 2,
        "base_score": [0.0, 0.2],
        "trees": [
            stump(1, 4, 2.5, -0.8, 0.6),
            stump(0, 0, 0.5, 0.5, -0.1)
        ]
    })
}

fn explanation() -> Value {
    json!({
        "feature_names": FEATURES,
        "expected_value": 0.33,
        "attributions": [
            [0.12, -0.03, 0.01, -0.25, 0.07],
            [0.5, 0.5, 0.5, 0.5, 0.5]
        ],
        "background": [
            [0.0, 0.0, 0.0, 2.0, 1.8],
            [1.0, 1.0, 1.0, 8.0, 2.9],
            [2.0, 2.0, 0.0, 12.0, 3.4],
            [2.0, 1.0, 1.0, 25.0, 3.0]
        ]
    })
}

fn write(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Write the seven artifacts into `dir`.
pub fn write_artifacts(dir: &Path) {
    write(
        &dir.join("label_encoders.json"),
        &json!({
            "suspect_product_active_ingredients": {"classes": ["Caffeine", "Gentamicin", "Paracetamol"]},
            "reason_for_use": {"classes": ["Apnoea", "Fever", "Sepsis"]},
            "sex": {"classes": ["F", "M"]}
        }),
    );
    write(
        &dir.join("le_y_reaction.json"),
        &json!({"classes": ["Jaundice", "Rash", "Tachycardia"]}),
    );
    write(
        &dir.join("le_y_outcome.json"),
        &json!({"classes": ["Hospitalised", "Recovered"]}),
    );
    write(&dir.join("reaction_model.json"), &reaction_model());
    write(&dir.join("outcome_model.json"), &outcome_model());
    write(&dir.join("xai_reaction.json"), &explanation());
    write(&dir.join("xai_outcome.json"), &explanation());
}

pub fn config(dir: &Path, mode: ExplanationMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.model_dir = dir.to_path_buf();
    config.plot_path = dir.join("static").join("xai_plot.svg");
    config.explanation.mode = mode;
    config
}
