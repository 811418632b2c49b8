//! Scale readings and polling modes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single weight sample from the scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleReading {
    /// Weight in kg
    pub weight: f64,
    pub is_stable: bool,
    pub timestamp: DateTime<Utc>,
}

impl ScaleReading {
    pub fn stable(weight: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            weight,
            is_stable: true,
            timestamp,
        }
    }

    pub fn unstable(weight: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            weight,
            is_stable: false,
            timestamp,
        }
    }

    /// Age of the reading relative to `now`, in milliseconds
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_milliseconds()
    }
}

/// Cadence at which fresh readings are requested from the scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollingMode {
    #[default]
    Idle,
    /// Low-frequency polling for the live display
    Reserve,
    /// High-frequency polling while an item is being verified
    Active,
    /// Engine picks reserve or active from the checklist
    Auto,
}

impl PollingMode {
    pub fn label(&self) -> &'static str {
        match self {
            PollingMode::Idle => "idle",
            PollingMode::Reserve => "reserve",
            PollingMode::Active => "active",
            PollingMode::Auto => "auto",
        }
    }
}
