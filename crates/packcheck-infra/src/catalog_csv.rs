//! Product catalog loaded from CSV
//!
//! Expected columns (header required):
//! sku, name, unit_weight_kg, [barcode]

use std::collections::HashMap;
use std::path::Path;

use packcheck_domain::model::BoxSettings;
use packcheck_domain::repository::CatalogProvider;
use packcheck_types::{Error, Result};
use serde::Deserialize;

use crate::box_set::load_box_set;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub unit_weight_kg: Option<f64>,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// In-memory catalog built from a CSV file and an optional box set
#[derive(Debug, Clone, Default)]
pub struct CsvCatalog {
    entries: HashMap<String, CatalogEntry>,
    boxes: Vec<BoxSettings>,
}

impl CsvCatalog {
    pub fn load(csv_path: &Path) -> Result<Self> {
        if !csv_path.exists() {
            return Err(Error::FileNotFound(csv_path.display().to_string()));
        }
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(csv_path)?;
        Self::from_reader(reader)
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut entries = HashMap::new();
        for (line, record) in reader.deserialize::<CatalogEntry>().enumerate() {
            match record {
                Ok(mut entry) => {
                    if entry.sku.is_empty() {
                        tracing::warn!(line = line + 2, "catalog row without sku skipped");
                        continue;
                    }
                    entry.barcode = entry.barcode.filter(|b| !b.is_empty());
                    entries.insert(entry.sku.clone(), entry);
                }
                Err(err) => {
                    tracing::warn!(line = line + 2, %err, "malformed catalog row skipped");
                }
            }
        }
        Ok(Self {
            entries,
            boxes: Vec::new(),
        })
    }

    pub fn with_box_set(mut self, path: &Path) -> Result<Self> {
        self.boxes = load_box_set(path)?;
        Ok(self)
    }

    pub fn with_boxes(mut self, boxes: Vec<BoxSettings>) -> Self {
        self.boxes = boxes;
        self
    }

    pub fn get(&self, sku: &str) -> Option<&CatalogEntry> {
        self.entries.get(sku)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogProvider for CsvCatalog {
    fn unit_weight(&self, sku: &str) -> Result<f64> {
        let entry = self
            .entries
            .get(sku)
            .ok_or_else(|| Error::UnknownSku(sku.to_string()))?;
        match entry.unit_weight_kg {
            Some(weight) if weight.is_finite() && weight >= 0.0 => Ok(weight),
            other => {
                tracing::warn!(sku, weight = ?other, "invalid unit weight, using 0 kg");
                Ok(0.0)
            }
        }
    }

    fn barcode(&self, sku: &str) -> Option<String> {
        self.entries.get(sku).and_then(|entry| entry.barcode.clone())
    }

    fn box_types(&self) -> Result<Vec<BoxSettings>> {
        Ok(self.boxes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "sku,name,unit_weight_kg,barcode\n\
                       soup,Miso soup,0.33,4901234567894\n\
                       rice, Rice bowl ,0.2,\n\
                       bad,Broken,-1,\n\
                       nan,Missing weight,,\n";

    #[test]
    fn test_load_entries() {
        let catalog = CsvCatalog::from_csv_str(CSV).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.unit_weight("soup").unwrap(), 0.33);
        assert_eq!(catalog.get("rice").unwrap().name, "Rice bowl");
        assert_eq!(catalog.barcode("soup").as_deref(), Some("4901234567894"));
        assert_eq!(catalog.barcode("rice"), None);
    }

    #[test]
    fn test_invalid_weights_default_to_zero() {
        let catalog = CsvCatalog::from_csv_str(CSV).unwrap();
        assert_eq!(catalog.unit_weight("bad").unwrap(), 0.0);
        assert_eq!(catalog.unit_weight("nan").unwrap(), 0.0);
    }

    #[test]
    fn test_unknown_sku() {
        let catalog = CsvCatalog::from_csv_str(CSV).unwrap();
        assert!(matches!(catalog.unit_weight("zzz"), Err(Error::UnknownSku(_))));
    }

    #[test]
    fn test_load_from_file_with_box_set() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("catalog.csv");
        let toml_path = dir.path().join("boxes.toml");
        std::fs::write(&csv_path, CSV).unwrap();
        std::fs::write(&toml_path, "[[boxes]]\nname = \"S\"\ncapacity = 4\nown_weight = 0.2\n").unwrap();

        let catalog = CsvCatalog::load(&csv_path).unwrap().with_box_set(&toml_path).unwrap();
        assert_eq!(catalog.box_types().unwrap().len(), 1);
    }
}
