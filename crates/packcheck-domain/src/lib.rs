//! Domain layer for order-assembly verification
//!
//! Pure data model and services: tolerance bands, box planning, checklist
//! construction, barcode matching and the per-item verification reducer.
//! Nothing in this crate touches hardware, files or clocks directly.

pub mod model;
pub mod repository;
pub mod service;
