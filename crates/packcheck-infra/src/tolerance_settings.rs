//! Tolerance settings stored as TOML
//!
//! ```toml
//! [tolerance]
//! kind = "combined"
//! percentage = 2.0
//! absolute_grams = 10.0
//! ```

use std::path::PathBuf;

use packcheck_domain::model::WeightTolerancePolicy;
use packcheck_domain::repository::ToleranceSettingsProvider;
use packcheck_types::Result;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    tolerance: Option<WeightTolerancePolicy>,
}

pub struct FileToleranceSettings {
    path: PathBuf,
}

impl FileToleranceSettings {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ToleranceSettingsProvider for FileToleranceSettings {
    /// Missing file or section yields the default policy; an invalid policy
    /// is replaced by the default with a warning
    fn tolerance_policy(&self) -> Result<WeightTolerancePolicy> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no tolerance settings file, using defaults");
            return Ok(WeightTolerancePolicy::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let settings: SettingsFile = toml::from_str(&content)?;
        Ok(settings.tolerance.unwrap_or_default().or_default())
    }
}
