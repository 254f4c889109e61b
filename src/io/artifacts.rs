// src/io/artifacts.rs
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::core::{AdrError, Result};

pub const REACTION_MODEL: &str = "reaction_model.json";
pub const OUTCOME_MODEL: &str = "outcome_model.json";
pub const LABEL_ENCODERS: &str = "label_encoders.json";
pub const LE_Y_REACTION: &str = "le_y_reaction.json";
pub const LE_Y_OUTCOME: &str = "le_y_outcome.json";
pub const XAI_REACTION: &str = "xai_reaction.json";
pub const XAI_OUTCOME: &str = "xai_outcome.json";

/// Every file the inference pipeline needs from the model directory.
pub const REQUIRED: [&str; 7] = [
    REACTION_MODEL,
    OUTCOME_MODEL,
    LABEL_ENCODERS,
    LE_Y_REACTION,
    LE_Y_OUTCOME,
    XAI_REACTION,
    XAI_OUTCOME,
];

/// Fail on the first required artifact that does not exist.
pub fn require(dir: &Path) -> Result<()> {
    for name in REQUIRED {
        let path = dir.join(name);
        if !path.is_file() {
            return Err(AdrError::MissingArtifact(path));
        }
    }
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AdrError::MissingArtifact(path.to_path_buf()),
        _ => AdrError::Io(e),
    })?;
    // Well-formed JSON that fails a type's own checks is a bad artifact.
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        if e.is_data() {
            AdrError::Configuration(format!("{}: {}", path.display(), e))
        } else {
            AdrError::Json(e)
        }
    })
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}
