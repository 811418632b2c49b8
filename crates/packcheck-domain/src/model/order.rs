//! Order data as delivered by the order provider

use serde::{Deserialize, Serialize};

/// Fulfilment status carried by the external order system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    InProgress,
    ReadyToShip,
    Shipped,
}

impl OrderStatus {
    /// Whether the order was already fulfilled upstream
    pub fn is_ready(&self) -> bool {
        matches!(self, OrderStatus::ReadyToShip | OrderStatus::Shipped)
    }
}

/// One line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub status: OrderStatus,
    pub items: Vec<OrderLine>,
}

impl Order {
    pub fn total_portions(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }
}

/// An order line resolved against the catalog, ready for box planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortionItem {
    pub sku: String,
    pub name: String,
    /// Number of portions (>= 1)
    pub quantity: u32,
    /// Weight of one portion in kg
    pub unit_weight: f64,
    #[serde(default)]
    pub barcode: Option<String>,
}

impl PortionItem {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, quantity: u32, unit_weight: f64) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            quantity,
            unit_weight,
            barcode: None,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Expected weight of `portions` portions of this item
    pub fn weight_of(&self, portions: u32) -> f64 {
        if self.unit_weight.is_finite() && self.unit_weight > 0.0 {
            self.unit_weight * portions as f64
        } else {
            0.0
        }
    }
}
