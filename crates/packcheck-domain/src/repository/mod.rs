//! Collaborator traits consumed by the verification engine
//!
//! The engine owns no wire format: orders, catalog data, tolerance settings,
//! the scale and the notification surface are injected through these traits.

use crate::model::{BoxSettings, Notification, Order, ScaleReading, WeightTolerancePolicy};
use packcheck_types::Result;

/// Source of orders to assemble
pub trait OrderProvider {
    /// Load an order by id, fetched once per order load
    fn load_order(&self, order_id: &str) -> Result<Order>;

    /// Ids of all orders known to the provider
    fn order_ids(&self) -> Result<Vec<String>>;
}

/// Product and box catalog
pub trait CatalogProvider {
    /// Weight of one portion of `sku` in kg
    fn unit_weight(&self, sku: &str) -> Result<f64>;

    /// Scannable barcode for `sku`, if it differs from the sku itself
    fn barcode(&self, sku: &str) -> Option<String>;

    /// Available box types, ascending by capacity
    fn box_types(&self) -> Result<Vec<BoxSettings>>;
}

/// Persisted tolerance settings
pub trait ToleranceSettingsProvider {
    fn tolerance_policy(&self) -> Result<WeightTolerancePolicy>;
}

/// Weight acquisition hardware
pub trait ScaleDevice {
    /// Latest reading known to the device
    fn current_weight(&mut self) -> Result<ScaleReading>;

    fn start_active_polling(&mut self);

    fn start_reserve_polling(&mut self);

    fn stop_active_polling(&mut self);

    /// Next barcode from the scanner, if one arrived since the last call
    fn take_barcode(&mut self) -> Option<String>;
}

/// Surface that shows alerts to the operator
pub trait NotificationSink {
    fn notify(&mut self, notification: &Notification);
}
