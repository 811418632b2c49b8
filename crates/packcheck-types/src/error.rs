//! Error types for packcheck

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Invalid configuration value {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Malformed policy or catalog data
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Unknown SKU in catalog: {0}")]
    UnknownSku(String),

    #[error("Scale unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Box capacity exceeded: {portions} portion(s) unallocated")]
    AllocationOverflow { portions: u32, items: Vec<String> },

    #[error("Stale order context: timer armed for epoch {armed}, current epoch {current}")]
    StaleOrderContext { armed: u64, current: u64 },

    #[error("Excel export error: {0}")]
    Excel(String),
}

pub type Result<T> = std::result::Result<T, Error>;
