//! Application service layer - assembly session, polling, timers, config, export

pub mod assembly_service;
pub mod config;
pub mod export;
pub mod notify;
pub mod polling;
pub mod repository;
pub mod session;
pub mod simulation;
pub mod timer;

pub use assembly_service::{prepare_order, PreparedOrder};
pub use config::Config;
pub use session::{AssemblySession, SessionError};
