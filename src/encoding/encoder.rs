// src/encoding/encoder.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::{AdrError, Result};

/// Bidirectional mapping between string labels and contiguous integers.
///
/// Fitting sorts the distinct values, so a freshly fitted encoder assigns
/// codes in lexicographic order. Values appended later through
/// [`CategoricalEncoder::encode`] take the next free code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncoderFile", into = "EncoderFile")]
pub struct CategoricalEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct EncoderFile {
    classes: Vec<String>,
}

impl TryFrom<EncoderFile> for CategoricalEncoder {
    type Error = String;

    fn try_from(file: EncoderFile) -> std::result::Result<Self, Self::Error> {
        CategoricalEncoder::from_classes(file.classes).map_err(|e| e.to_string())
    }
}

impl From<CategoricalEncoder> for EncoderFile {
    fn from(enc: CategoricalEncoder) -> Self {
        EncoderFile {
            classes: enc.classes,
        }
    }
}

impl CategoricalEncoder {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        CategoricalEncoder { classes, index }
    }

    /// Rebuild an encoder from a persisted class list, keeping its order.
    pub fn from_classes(classes: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(classes.len());
        for (i, c) in classes.iter().enumerate() {
            if index.insert(c.clone(), i).is_some() {
                return Err(AdrError::Configuration(format!(
                    "Encoder lists class '{}' more than once.",
                    c
                )));
            }
        }
        Ok(CategoricalEncoder { classes, index })
    }

    pub fn transform(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Encode `value`, appending it to the known classes first if unseen.
    pub fn encode(&mut self, value: &str) -> usize {
        if let Some(code) = self.transform(value) {
            return code;
        }
        let code = self.classes.len();
        self.classes.push(value.to_string());
        self.index.insert(value.to_string(), code);
        code
    }

    pub fn inverse_transform(&self, code: usize) -> Result<&str> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or(AdrError::UnknownLabel {
                index: code,
                classes: self.classes.len(),
            })
    }

    pub fn contains(&self, value: &str) -> bool {
        self.index.contains_key(value)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
