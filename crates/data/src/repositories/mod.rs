//! Typed repository access.

mod alert_repo;

pub use alert_repo::{AlertRepository, AlertStore};
