//! Row models returned by repositories.
//!
//! Keep these structs focused on the data returned by queries. Domain
//! conversion happens in `TryFrom` so a corrupt row is an error, not a panic.

use crate::error::BadgeError;
use crate::model::{BadgeRequest, BadgeType, PaymentStatus, RequestStatus};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestRow {
    pub id: String,
    pub job_id: String,
    pub recruiter_id: String,
    pub company_id: String,
    pub badge_type: String,
    pub price: i64,
    pub duration_days: i64,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub payment_status: String,
    pub status: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for BadgeRequest {
    type Error = BadgeError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let badge_type = BadgeType::parse(&row.badge_type).ok_or_else(|| {
            BadgeError::Corrupt(format!("{} has badge_type {}", row.id, row.badge_type))
        })?;
        let status = RequestStatus::parse(&row.status)
            .ok_or_else(|| BadgeError::Corrupt(format!("{} has status {}", row.id, row.status)))?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            BadgeError::Corrupt(format!(
                "{} has payment_status {}",
                row.id, row.payment_status
            ))
        })?;
        Ok(BadgeRequest {
            id: row.id,
            job_id: row.job_id,
            recruiter_id: row.recruiter_id,
            company_id: row.company_id,
            badge_type,
            price: row.price,
            duration_days: row.duration_days,
            payment_method: row.payment_method,
            payment_reference: row.payment_reference,
            payment_status,
            status,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            approved_by: row.approved_by,
            admin_notes: row.admin_notes,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
        })
    }
}

/// Event slice used by the outbox worker.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxItem {
    pub id: i64,
    pub request_id: String,
    pub kind: String,
    pub payload: String,
    pub attempt: i32,
}

/// A (job, badge) whose flag could not be written and awaits repair.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReconciliationRow {
    pub job_id: String,
    pub badge_type: String,
    pub last_error: String,
    pub attempts: i64,
    pub flagged_at: DateTime<Utc>,
}
