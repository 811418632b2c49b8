//! Repository adapters for the file-backed collaborators
//!
//! Store layout:
//! - `orders/<id>.json`
//! - `catalog.csv`
//! - `boxes.toml` (optional)
//! - `settings.toml` (tolerance, optional)

use std::path::{Path, PathBuf};

use packcheck_infra::{CsvCatalog, FileOrderProvider, FileToleranceSettings};
use packcheck_types::Result;

use crate::config::Config;

pub const ORDERS_DIR: &str = "orders";
pub const CATALOG_FILE: &str = "catalog.csv";
pub const BOX_SET_FILE: &str = "boxes.toml";
pub const SETTINGS_FILE: &str = "settings.toml";

/// Open file-based order provider
pub fn open_order_provider(config: &Config) -> Result<FileOrderProvider> {
    let store_dir = config.store_dir()?;
    open_order_provider_at(store_dir.join(ORDERS_DIR))
}

/// Open file-based order provider at a custom directory
pub fn open_order_provider_at(dir: PathBuf) -> Result<FileOrderProvider> {
    FileOrderProvider::new(dir)
}

/// Open the catalog with the store's box set, if present
pub fn open_catalog(config: &Config) -> Result<CsvCatalog> {
    let store_dir = config.store_dir()?;
    open_catalog_at(&store_dir.join(CATALOG_FILE), Some(&store_dir.join(BOX_SET_FILE)))
}

/// Open a catalog CSV, optionally with a box set TOML
pub fn open_catalog_at(csv_path: &Path, box_set: Option<&Path>) -> Result<CsvCatalog> {
    let catalog = CsvCatalog::load(csv_path)?;
    match box_set {
        Some(path) if path.exists() => catalog.with_box_set(path),
        _ => Ok(catalog),
    }
}

/// Open tolerance settings from the store
pub fn open_tolerance_settings(config: &Config) -> Result<FileToleranceSettings> {
    let store_dir = config.store_dir()?;
    Ok(FileToleranceSettings::new(store_dir.join(SETTINGS_FILE)))
}
