//! Box type definitions

use serde::{Deserialize, Serialize};

/// Outer dimensions of a box in centimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

/// A box type available for packing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSettings {
    /// Display name (e.g., "S", "M-60")
    pub name: String,
    #[serde(default)]
    pub dimensions: Option<BoxDimensions>,
    /// Capacity in portions. 0 means unlimited.
    #[serde(default)]
    pub capacity: u32,
    /// Empty box weight in kg
    #[serde(default)]
    pub own_weight: f64,
}

impl BoxSettings {
    pub fn new(name: impl Into<String>, capacity: u32, own_weight: f64) -> Self {
        Self {
            name: name.into(),
            dimensions: None,
            capacity,
            own_weight,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.capacity == 0
    }

    /// Own weight, with negative or non-finite values read as zero
    pub fn own_weight(&self) -> f64 {
        if self.own_weight.is_finite() && self.own_weight > 0.0 {
            self.own_weight
        } else {
            0.0
        }
    }
}
