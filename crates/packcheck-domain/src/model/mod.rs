//! Domain model types

pub mod box_settings;
pub mod checklist;
pub mod notification;
pub mod order;
pub mod scale;
pub mod tolerance_policy;

pub use box_settings::{BoxDimensions, BoxSettings};
pub use checklist::{Checklist, ChecklistItem, ItemKind, ItemStatus, StatusCounts};
pub use notification::Notification;
pub use order::{Order, OrderLine, OrderStatus, PortionItem};
pub use scale::{PollingMode, ScaleReading};
pub use tolerance_policy::{ScalingCurve, ToleranceKind, WeightTolerancePolicy};
