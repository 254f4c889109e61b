// src/io/dataset.rs
use log::{debug, info};
use std::io::Read;
use std::path::Path;

use crate::core::{AdrError, Dataset, Result, FEATURE_COLUMNS, PRODUCT, REASON, SEX};
use crate::encoding::EncoderRegistry;
use crate::utils::{coerce_numeric, normalize_column_name};

pub const REACTIONS: &str = "reactions";
pub const OUTCOMES: &str = "outcomes";

/// Columns the dataset must carry after header normalization.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    PRODUCT,
    REASON,
    REACTIONS,
    OUTCOMES,
    SEX,
    crate::core::AGE,
    crate::core::WEIGHT,
];

/// One dataset row, cells trimmed. Empty cells are missing values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub product: String,
    pub reason: String,
    pub reaction: String,
    pub outcome: String,
    pub sex: String,
    pub age: String,
    pub weight: String,
}

impl DatasetRecord {
    fn is_complete(&self) -> bool {
        [
            &self.product,
            &self.reason,
            &self.reaction,
            &self.outcome,
            &self.sex,
            &self.age,
            &self.weight,
        ]
        .iter()
        .all(|v| !v.is_empty())
    }
}

/// The adverse-reaction report table.
#[derive(Debug, Clone)]
pub struct AdrDataset {
    records: Vec<DatasetRecord>,
}

impl AdrDataset {
    pub fn from_csv(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AdrError::MissingArtifact(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file)?;
        info!(
            "Loaded {} dataset rows from {}",
            dataset.records.len(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(normalize_column_name)
            .collect();

        let mut positions = [0usize; 7];
        for (slot, col) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h == col)
                .ok_or_else(|| AdrError::MissingColumn(col.to_string()))?;
        }

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let cell = |i: usize| row.get(positions[i]).unwrap_or("").to_string();
            records.push(DatasetRecord {
                product: cell(0),
                reason: cell(1),
                reaction: cell(2),
                outcome: cell(3),
                sex: cell(4),
                age: cell(5),
                weight: cell(6),
            });
        }
        Ok(AdrDataset { records })
    }

    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows with every required field present.
    pub fn complete_records(&self) -> Vec<&DatasetRecord> {
        self.records.iter().filter(|r| r.is_complete()).collect()
    }

    /// Sorted, distinct products for the request form.
    pub fn unique_products(&self) -> Vec<String> {
        unique(self.records.iter().map(|r| r.product.as_str()))
    }

    /// Sorted, distinct reasons for use for the request form.
    pub fn unique_reasons(&self) -> Vec<String> {
        unique(self.records.iter().map(|r| r.reason.as_str()))
    }

    /// Encoded feature matrix of the complete rows, in training column order.
    ///
    /// Rows whose categorical values the registry does not know are skipped;
    /// the registry is never grown from here.
    pub fn feature_matrix(&self, registry: &EncoderRegistry) -> Result<Dataset> {
        let mut values = Vec::new();
        let mut rows = 0;
        for rec in self.complete_records() {
            let codes = [
                registry.transform(PRODUCT, &rec.product)?,
                registry.transform(REASON, &rec.reason)?,
                registry.transform(SEX, &rec.sex)?,
            ];
            if codes.iter().any(Option::is_none) {
                debug!("Skipping row with unencodable values: {:?}", rec);
                continue;
            }
            values.extend(codes.iter().flatten().map(|&c| c as f64));
            values.push(coerce_numeric(&rec.age));
            values.push(coerce_numeric(&rec.weight));
            rows += 1;
        }
        Ok(Dataset::from_shape_vec((rows, FEATURE_COLUMNS.len()), values)?)
    }
}

fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = values
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Suspect Product Active Ingredients, Reason For Use ,Reactions,Outcomes,Sex,Patient Age,Patient Weight
Paracetamol,Fever,Rash,Recovered,M,10,3.2
Gentamicin,Sepsis,Jaundice,Hospitalised,F,2,2.9
Paracetamol,Fever,Rash,Recovered,F,,3.0
Caffeine,Apnoea,Tachycardia,Recovered,M,5,unknown
";

    #[test]
    fn normalizes_headers_and_reads_rows() {
        let ds = AdrDataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.records()[0].product, "Paracetamol");
        assert_eq!(ds.records()[1].reason, "Sepsis");
    }

    #[test]
    fn missing_column_is_fatal() {
        let err = AdrDataset::from_reader("product,reason\na,b\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AdrError::MissingColumn(ref c) if c == PRODUCT));
        assert!(err.is_startup_fatal());
    }

    #[test]
    fn drops_incomplete_rows() {
        let ds = AdrDataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(ds.complete_records().len(), 3);
    }

    #[test]
    fn option_lists_are_sorted_and_distinct() {
        let ds = AdrDataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(
            ds.unique_products(),
            vec!["Caffeine", "Gentamicin", "Paracetamol"]
        );
        assert_eq!(ds.unique_reasons(), vec!["Apnoea", "Fever", "Sepsis"]);
    }

    #[test]
    fn feature_matrix_encodes_complete_rows() {
        let ds = AdrDataset::from_reader(CSV.as_bytes()).unwrap();
        let reg = EncoderRegistry::fit(&ds).unwrap();
        let m = ds.feature_matrix(&reg).unwrap();
        assert_eq!(m.dim(), (3, 5));
        // Paracetamol is the last of three sorted products.
        assert_eq!(m[[0, 0]], 2.0);
        assert_eq!(m[[0, 3]], 10.0);
        // "unknown" weight coerces to zero.
        assert_eq!(m[[2, 4]], 0.0);
    }

    #[test]
    fn missing_file_is_missing_artifact() {
        let err = AdrDataset::from_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, AdrError::MissingArtifact(_)));
    }
}
