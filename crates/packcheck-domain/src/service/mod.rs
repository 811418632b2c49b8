//! Domain services

pub mod barcode_matcher;
pub mod checklist_builder;
pub mod packing_planner;
pub mod report;
pub mod tolerance;
pub mod verification;

pub use barcode_matcher::{match_barcode, ScanDebounce, ScanRejection};
pub use checklist_builder::{box_item_id, combine, product_item_id};
pub use packing_planner::{plan_boxes, select_boxes, BoxAssignment, PackingPlan, UnallocatedItem};
pub use report::{generate_checklist_report, generate_plan_report};
pub use tolerance::{calculate_tolerance, is_within_tolerance};
pub use verification::{reduce, Effect, Rejection, SettleKind, Transition, VerificationEvent, VerificationState};
