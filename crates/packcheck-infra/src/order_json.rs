//! Orders stored as JSON files, one file per order (`<id>.json`)

use std::path::{Path, PathBuf};

use packcheck_domain::model::Order;
use packcheck_domain::repository::OrderProvider;
use packcheck_types::{Error, Result};

/// Load a single order file
pub fn load_order_file(path: &Path) -> Result<Order> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let order: Order = serde_json::from_str(&content)?;
    Ok(order)
}

pub struct FileOrderProvider {
    dir: PathBuf,
}

impl FileOrderProvider {
    pub fn new(dir: PathBuf) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::FileNotFound(dir.display().to_string()));
        }
        Ok(Self { dir })
    }

    fn order_path(&self, order_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", order_id))
    }
}

impl OrderProvider for FileOrderProvider {
    fn load_order(&self, order_id: &str) -> Result<Order> {
        let path = self.order_path(order_id);
        if !path.exists() {
            return Err(Error::OrderNotFound(order_id.to_string()));
        }
        load_order_file(&path)
    }

    fn order_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
