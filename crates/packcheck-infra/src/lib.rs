//! Infrastructure layer
//!
//! File-based implementations of the collaborator traits declared in
//! `packcheck_domain::repository`.

pub mod box_set;
pub mod catalog_csv;
pub mod notification;
pub mod order_json;
pub mod scripted_scale;
pub mod tolerance_settings;

pub use box_set::load_box_set;
pub use catalog_csv::CsvCatalog;
pub use notification::{ConsoleSink, MemorySink};
pub use order_json::FileOrderProvider;
pub use scripted_scale::{ScriptEvent, ScriptedScale, SimulationScript, TimedEvent};
pub use tolerance_settings::FileToleranceSettings;
