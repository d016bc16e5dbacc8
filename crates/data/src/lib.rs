//! Alert persistence for the surge screener.
//!
//! This crate provides:
//! - Database client for `PostgreSQL`
//! - The persisted alert model
//! - The alert repository and the `AlertStore` seam it implements

pub mod database;
pub mod models;
pub mod repositories;

pub use database::DatabaseClient;
pub use models::AlertRecord;
pub use repositories::{AlertRepository, AlertStore};
