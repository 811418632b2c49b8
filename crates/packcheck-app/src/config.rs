//! Configuration management for packcheck
//!
//! Config stored at: ~/.config/packcheck/config.json

use std::path::{Path, PathBuf};

use chrono::Duration;
use packcheck_types::{ConfigError, OutputFormat, PackingMode, Result};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pause after a successful weighing before the item is done (ms)
    #[serde(default = "default_success_settle_ms")]
    pub success_settle_ms: u64,

    /// Pause after a failed weighing before the item is pending again (ms)
    #[serde(default = "default_error_settle_ms")]
    pub error_settle_ms: u64,

    /// Window in which a repeated scan of the same code is dropped (ms)
    #[serde(default = "default_scan_cooldown_ms")]
    pub scan_cooldown_ms: u64,

    /// Window in which an alert with the same key is not shown again (ms)
    #[serde(default = "default_notification_cooldown_ms")]
    pub notification_cooldown_ms: u64,

    /// Readings older than this are refreshed before evaluation (ms)
    #[serde(default = "default_reading_freshness_ms")]
    pub reading_freshness_ms: u64,

    #[serde(default = "default_reserve_poll_ms")]
    pub reserve_poll_ms: u64,

    #[serde(default = "default_active_poll_ms")]
    pub active_poll_ms: u64,

    /// Active polling falls back to reserve after this long (ms)
    #[serde(default = "default_active_timeout_ms")]
    pub active_timeout_ms: u64,

    #[serde(default)]
    pub packing_mode: PackingMode,

    /// Disable scan debouncing
    #[serde(default)]
    pub debug_scan: bool,

    /// Switch to the next box once the active one is complete
    #[serde(default)]
    pub auto_advance_box: bool,

    /// Default output format (table, json)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,

    /// Data directory override (orders, catalog, settings)
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

fn default_success_settle_ms() -> u64 {
    1000
}

fn default_error_settle_ms() -> u64 {
    600
}

fn default_scan_cooldown_ms() -> u64 {
    1500
}

fn default_notification_cooldown_ms() -> u64 {
    3000
}

fn default_reading_freshness_ms() -> u64 {
    1500
}

fn default_reserve_poll_ms() -> u64 {
    1000
}

fn default_active_poll_ms() -> u64 {
    250
}

fn default_active_timeout_ms() -> u64 {
    20_000
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Table
}

impl Default for Config {
    fn default() -> Self {
        Self {
            success_settle_ms: default_success_settle_ms(),
            error_settle_ms: default_error_settle_ms(),
            scan_cooldown_ms: default_scan_cooldown_ms(),
            notification_cooldown_ms: default_notification_cooldown_ms(),
            reading_freshness_ms: default_reading_freshness_ms(),
            reserve_poll_ms: default_reserve_poll_ms(),
            active_poll_ms: default_active_poll_ms(),
            active_timeout_ms: default_active_timeout_ms(),
            packing_mode: PackingMode::default(),
            debug_scan: false,
            auto_advance_box: false,
            output_format: default_output_format(),
            store_dir: None,
        }
    }
}

/// Upper bound for every configured delay, one day
pub const MAX_DELAY_MS: u64 = 86_400_000;

/// Milliseconds as a `Duration`, capped at `MAX_DELAY_MS`
pub(crate) fn millis(ms: u64) -> Duration {
    Duration::milliseconds(ms.min(MAX_DELAY_MS) as i64)
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("packcheck");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the data directory path
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.store_dir {
            return Ok(dir.clone());
        }

        let store_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join("packcheck");
        Ok(store_dir)
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Reject delays outside `1..=MAX_DELAY_MS` (cooldowns may be 0)
    pub fn validate(&self) -> Result<()> {
        let delays = [
            ("success_settle_ms", self.success_settle_ms, 0),
            ("error_settle_ms", self.error_settle_ms, 0),
            ("scan_cooldown_ms", self.scan_cooldown_ms, 0),
            ("notification_cooldown_ms", self.notification_cooldown_ms, 0),
            ("reading_freshness_ms", self.reading_freshness_ms, 0),
            ("reserve_poll_ms", self.reserve_poll_ms, 1),
            ("active_poll_ms", self.active_poll_ms, 1),
            ("active_timeout_ms", self.active_timeout_ms, 1),
        ];
        for (field, value, min) in delays {
            if value < min || value > MAX_DELAY_MS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("{} ms is outside {}..={} ms", value, min, MAX_DELAY_MS),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        Ok(())
    }

    pub fn success_settle(&self) -> Duration {
        millis(self.success_settle_ms)
    }

    pub fn error_settle(&self) -> Duration {
        millis(self.error_settle_ms)
    }

    pub fn scan_cooldown(&self) -> Duration {
        millis(self.scan_cooldown_ms)
    }

    pub fn notification_cooldown(&self) -> Duration {
        millis(self.notification_cooldown_ms)
    }

    pub fn reading_freshness(&self) -> Duration {
        millis(self.reading_freshness_ms)
    }

    pub fn reserve_poll(&self) -> Duration {
        millis(self.reserve_poll_ms)
    }

    pub fn active_poll(&self) -> Duration {
        millis(self.active_poll_ms)
    }

    pub fn active_timeout(&self) -> Duration {
        millis(self.active_timeout_ms)
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Packcheck Configuration")?;
        writeln!(f, "=======================")?;
        writeln!(f)?;
        writeln!(f, "Success settle:     {} ms", self.success_settle_ms)?;
        writeln!(f, "Error settle:       {} ms", self.error_settle_ms)?;
        writeln!(f, "Scan cooldown:      {} ms", self.scan_cooldown_ms)?;
        writeln!(f, "Alert cooldown:     {} ms", self.notification_cooldown_ms)?;
        writeln!(f, "Reading freshness:  {} ms", self.reading_freshness_ms)?;
        writeln!(
            f,
            "Polling:            reserve {} ms, active {} ms (timeout {} ms)",
            self.reserve_poll_ms, self.active_poll_ms, self.active_timeout_ms
        )?;
        writeln!(f, "Packing mode:       {}", self.packing_mode)?;
        writeln!(f, "Debug scan:         {}", self.debug_scan)?;
        writeln!(f, "Auto-advance box:   {}", self.auto_advance_box)?;
        writeln!(f, "Output format:      {}", self.output_format)?;
        writeln!(
            f,
            "Store dir:          {}",
            self.store_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:        {}", path.display())?;
        }

        Ok(())
    }
}
