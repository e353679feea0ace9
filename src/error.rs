//! Error taxonomy surfaced by the engine's operations.
use crate::model::{BadgeType, RequestStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("badge quota exhausted: {active_count} of {max_allowed} {badge_type} badges in use")]
    EligibilityExceeded {
        badge_type: BadgeType,
        active_count: i64,
        max_allowed: i64,
    },
    #[error("payment has not been confirmed")]
    PaymentNotConfirmed,
    #[error("badge request {0} not found")]
    RequestNotFound(String),
    #[error("cannot move badge request from {from} to {to}")]
    InvalidStateTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("badge request {id} changed concurrently; expected {expected}")]
    ConcurrencyConflict { id: String, expected: RequestStatus },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown account tier: {0}")]
    UnknownTier(String),
    #[error("flag projection failed for job {job_id} ({badge_type}): {message}")]
    ProjectionFailed {
        job_id: String,
        badge_type: BadgeType,
        message: String,
    },
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("corrupt ledger row: {0}")]
    Corrupt(String),
}

impl BadgeError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            BadgeError::EligibilityExceeded { .. } => "eligibility_exceeded",
            BadgeError::PaymentNotConfirmed => "payment_not_confirmed",
            BadgeError::RequestNotFound(_) => "request_not_found",
            BadgeError::InvalidStateTransition { .. } => "invalid_state_transition",
            BadgeError::ConcurrencyConflict { .. } => "concurrency_conflict",
            BadgeError::InvalidRequest(_) => "invalid_request",
            BadgeError::UnknownTier(_) => "unknown_tier",
            BadgeError::ProjectionFailed { .. } => "projection_failed",
            BadgeError::Storage(_) | BadgeError::Corrupt(_) => "internal",
        }
    }

    /// Message safe to show outside the service. Internal failures are masked.
    pub fn public_message(&self) -> String {
        match self {
            BadgeError::ConcurrencyConflict { .. } => {
                "badge request was modified concurrently; re-fetch and retry".to_string()
            }
            BadgeError::ProjectionFailed { .. }
            | BadgeError::Storage(_)
            | BadgeError::Corrupt(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type BadgeResult<T> = Result<T, BadgeError>;
