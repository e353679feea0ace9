//! Database module: row models and SQL repositories.
//!
//! - `model`: row structs decoded straight from queries plus outbox view models.
//! - `repo`: SQL-only functions. Every ledger write that must be atomic lives
//!   here as a single statement or a transaction-scoped helper.
//!
//! Callers import from `badge_engine::db`; the repository API is re-exported.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{OutboxItem, ReconciliationRow};
