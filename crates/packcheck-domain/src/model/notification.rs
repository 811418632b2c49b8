//! Operator-facing alerts

use packcheck_types::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub timeout_ms: u64,
    /// Semantic identity used for deduplication (item/condition, not text)
    pub dedupe_key: String,
}

impl Notification {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            dedupe_key: title.clone(),
            title,
            description: description.into(),
            severity,
            timeout_ms: 3000,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = key.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
