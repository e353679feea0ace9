pub mod api;
pub mod approval;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod job_board;
pub mod ledger;
pub mod model;
pub mod outbox;
pub mod projector;
pub mod sweeper;

pub use engine::BadgeEngine;
pub use error::{BadgeError, BadgeResult};
