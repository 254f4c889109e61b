// src/utils.rs
use ndarray::{Array1, ArrayView1};

/// Parse a form field as a number; anything unparseable (or NaN) becomes 0.
pub fn coerce_numeric(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if !v.is_nan() => v,
        _ => 0.0,
    }
}

/// Trim, lower-case and replace spaces with underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Index of the largest value; the first one wins ties. NaN never wins.
pub fn argmax(values: ArrayView1<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Numerically stable softmax.
pub fn softmax(raw: ArrayView1<f64>) -> Array1<f64> {
    let max = raw.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let exp = raw.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    if sum > 0.0 && sum.is_finite() {
        exp / sum
    } else {
        Array1::from_elem(raw.len(), 1.0 / raw.len().max(1) as f64)
    }
}
