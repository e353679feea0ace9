use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest badge window a request may buy.
pub const MAX_DURATION_DAYS: i64 = 3650;

/// Visual promotion a recruiter can buy for one job posting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BadgeType {
    Urgent,
    Featured,
}

impl BadgeType {
    pub const ALL: [BadgeType; 2] = [BadgeType::Urgent, BadgeType::Featured];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeType::Urgent => "urgent",
            BadgeType::Featured => "featured",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "urgent" => Some(BadgeType::Urgent),
            "featured" => Some(BadgeType::Featured),
            _ => None,
        }
    }

    /// Name of the boolean column on the job record this badge drives.
    pub fn flag_field(&self) -> &'static str {
        match self {
            BadgeType::Urgent => "is_urgent",
            BadgeType::Featured => "is_featured",
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a ledger row. Only ever moves forward:
/// `pending -> approved -> expired` or `pending -> rejected`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            "expired" => Some(RequestStatus::Expired),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Approved, RequestStatus::Expired)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// One promotion purchase attempt and its audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BadgeRequest {
    pub id: String,
    pub job_id: String,
    pub recruiter_id: String,
    pub company_id: String,
    pub badge_type: BadgeType,
    pub price: i64,
    pub duration_days: i64,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: RequestStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BadgeRequest {
    /// Whether this row alone makes the job's flag true at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        if self.status != RequestStatus::Approved {
            return false;
        }
        match (self.starts_at, self.ends_at) {
            (Some(start), Some(end)) => start <= now && now < end,
            _ => false,
        }
    }
}

/// Facts supplied by the external payment integration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentFacts {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub status: PaymentStatus,
}

/// Input to `ledger::create_request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBadgeRequest {
    pub job_id: String,
    pub recruiter_id: String,
    pub company_id: String,
    pub badge_type: BadgeType,
    pub price: i64,
    /// Falls back to the tier's canonical duration when absent.
    #[serde(default)]
    pub duration_days: Option<i64>,
    pub payment: PaymentFacts,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Eligibility {
    pub can_request: bool,
    pub active_count: i64,
    pub max_allowed: i64,
    pub remaining: i64,
}

impl Eligibility {
    pub fn from_counts(active_count: i64, max_allowed: i64) -> Self {
        Self {
            can_request: active_count < max_allowed,
            active_count,
            max_allowed,
            remaining: (max_allowed - active_count).max(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_count: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: u64,
    pub repaired: u64,
    pub failed: u64,
}

/// Filters for the moderation queue and recruiter history views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub recruiter_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RequestCreated,
    RequestApproved,
    RequestRejected,
    RequestExpired,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RequestCreated => "request_created",
            EventKind::RequestApproved => "request_approved",
            EventKind::RequestRejected => "request_rejected",
            EventKind::RequestExpired => "request_expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "request_created" => Some(EventKind::RequestCreated),
            "request_approved" => Some(EventKind::RequestApproved),
            "request_rejected" => Some(EventKind::RequestRejected),
            "request_expired" => Some(EventKind::RequestExpired),
            _ => None,
        }
    }
}

/// State-change notification handed to the notification layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BadgeEvent {
    pub kind: EventKind,
    pub request_id: String,
    pub job_id: String,
    pub recruiter_id: String,
    pub badge_type: BadgeType,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl BadgeEvent {
    pub fn for_request(kind: EventKind, req: &BadgeRequest, occurred_at: DateTime<Utc>) -> Self {
        let reason = match kind {
            EventKind::RequestRejected => req.rejection_reason.clone(),
            _ => None,
        };
        Self {
            kind,
            request_id: req.id.clone(),
            job_id: req.job_id.clone(),
            recruiter_id: req.recruiter_id.clone(),
            badge_type: req.badge_type,
            status: req.status,
            reason,
            occurred_at,
        }
    }
}
