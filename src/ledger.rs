//! Creation and lookup of badge requests.
use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{self, Pool};
use crate::eligibility::EligibilityGuard;
use crate::error::{BadgeError, BadgeResult};
use crate::model::{
    BadgeEvent, BadgeRequest, EventKind, NewBadgeRequest, PaymentStatus, RequestFilter,
    RequestStatus, MAX_DURATION_DAYS,
};

#[derive(Debug, Clone)]
pub struct RequestLedger {
    pool: Pool,
    guard: EligibilityGuard,
}

impl RequestLedger {
    pub fn new(pool: Pool, guard: EligibilityGuard) -> Self {
        Self { pool, guard }
    }

    /// Record a paid promotion request as pending.
    ///
    /// The quota check is evaluated by the insert statement itself, so two
    /// concurrent creates racing for the last slot cannot both land. Price and
    /// duration are snapshotted on the row.
    #[instrument(skip_all, fields(recruiter_id = %new.recruiter_id, badge = %new.badge_type))]
    pub async fn create(
        &self,
        new: NewBadgeRequest,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        validate_new(&new)?;
        if new.payment.status != PaymentStatus::Completed {
            return Err(BadgeError::PaymentNotConfirmed);
        }

        let rule = self
            .guard
            .limits_for(&new.recruiter_id)
            .await?
            .rule(new.badge_type);
        let duration_days = new.duration_days.unwrap_or(rule.duration_days);

        let req = BadgeRequest {
            id: Uuid::new_v4().to_string(),
            job_id: new.job_id,
            recruiter_id: new.recruiter_id,
            company_id: new.company_id,
            badge_type: new.badge_type,
            price: new.price,
            duration_days,
            payment_method: new.payment.method,
            payment_reference: new.payment.reference,
            payment_status: new.payment.status,
            status: RequestStatus::Pending,
            starts_at: None,
            ends_at: None,
            approved_by: None,
            admin_notes: None,
            rejection_reason: None,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;
        if !db::insert_request_within_quota(&mut tx, &req, rule.max_active, now).await? {
            tx.rollback().await?;
            let active_count =
                db::count_holding_quota(&self.pool, &req.recruiter_id, req.badge_type, now).await?;
            return Err(BadgeError::EligibilityExceeded {
                badge_type: req.badge_type,
                active_count,
                max_allowed: rule.max_active,
            });
        }
        let event = BadgeEvent::for_request(EventKind::RequestCreated, &req, now);
        db::enqueue_event_tx(&mut tx, &event, now).await?;
        tx.commit().await?;

        info!(id = %req.id, job_id = %req.job_id, price = req.price, "badge request created");
        Ok(req)
    }

    pub async fn get(&self, id: &str) -> BadgeResult<BadgeRequest> {
        db::fetch_request(&self.pool, id)
            .await?
            .ok_or_else(|| BadgeError::RequestNotFound(id.to_string()))
    }

    pub async fn list(&self, filter: &RequestFilter) -> BadgeResult<Vec<BadgeRequest>> {
        db::list_requests(&self.pool, filter).await
    }
}

fn validate_new(new: &NewBadgeRequest) -> BadgeResult<()> {
    for (field, value) in [
        ("job_id", &new.job_id),
        ("recruiter_id", &new.recruiter_id),
        ("company_id", &new.company_id),
    ] {
        if value.trim().is_empty() {
            return Err(BadgeError::InvalidRequest(format!("{field} must be non-empty")));
        }
    }
    if new.price < 0 {
        return Err(BadgeError::InvalidRequest("price must be >= 0".into()));
    }
    if matches!(new.duration_days, Some(d) if !(1..=MAX_DURATION_DAYS).contains(&d)) {
        return Err(BadgeError::InvalidRequest(format!(
            "duration_days must be between 1 and {MAX_DURATION_DAYS}"
        )));
    }
    Ok(())
}
