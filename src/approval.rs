//! Human moderation of pending badge requests.
use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument};

use crate::db::{self, Pool, Transition};
use crate::error::{BadgeError, BadgeResult};
use crate::model::{BadgeEvent, BadgeRequest, EventKind, RequestStatus};
use crate::projector::JobFlagProjector;

#[derive(Clone)]
pub struct ApprovalGate {
    pool: Pool,
    projector: JobFlagProjector,
}

impl ApprovalGate {
    pub fn new(pool: Pool, projector: JobFlagProjector) -> Self {
        Self { pool, projector }
    }

    async fn load(&self, id: &str) -> BadgeResult<BadgeRequest> {
        db::fetch_request(&self.pool, id)
            .await?
            .ok_or_else(|| BadgeError::RequestNotFound(id.to_string()))
    }

    /// Move `current` out of pending and record the event, all in one
    /// transaction. Only the caller whose compare-and-swap lands gets the
    /// updated row back.
    async fn apply(
        &self,
        current: &BadgeRequest,
        transition: Transition<'_>,
        kind: EventKind,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        if !current.status.can_transition_to(transition.to_status()) {
            return Err(BadgeError::InvalidStateTransition {
                from: current.status,
                to: transition.to_status(),
            });
        }

        let id = current.id.as_str();
        let mut tx = self.pool.begin().await?;
        db::transition(&mut tx, id, &transition, now).await?;
        let updated = db::fetch_request(&mut *tx, id)
            .await?
            .ok_or_else(|| BadgeError::RequestNotFound(id.to_string()))?;
        let event = BadgeEvent::for_request(kind, &updated, now);
        db::enqueue_event_tx(&mut tx, &event, now).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Approve a pending request: its window opens at `now` and the job's
    /// flag is projected once the transition has committed.
    #[instrument(skip(self, notes, now))]
    pub async fn approve(
        &self,
        id: &str,
        approver_id: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        if approver_id.trim().is_empty() {
            return Err(BadgeError::InvalidRequest("approver_id must be non-empty".into()));
        }
        let current = self.load(id).await?;
        let ends_at = window_end(now, current.duration_days)?;
        let transition = Transition::Approve {
            approver_id,
            notes,
            starts_at: now,
            ends_at,
        };
        let approved = self
            .apply(&current, transition, EventKind::RequestApproved, now)
            .await?;
        info!(id, job_id = %approved.job_id, badge = %approved.badge_type, "badge request approved");

        self.projector
            .project_after_transition(&approved.job_id, approved.badge_type, now)
            .await;
        Ok(approved)
    }

    /// Reject a pending request and record the refund obligation. A pending
    /// request never projected a flag, so jobs are left alone.
    #[instrument(skip(self, reason, now))]
    pub async fn reject(
        &self,
        id: &str,
        approver_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        if approver_id.trim().is_empty() {
            return Err(BadgeError::InvalidRequest("approver_id must be non-empty".into()));
        }
        if reason.trim().is_empty() {
            return Err(BadgeError::InvalidRequest("rejection reason must be non-empty".into()));
        }
        let transition = Transition::Reject {
            approver_id,
            reason,
        };
        let current = self.load(id).await?;
        let rejected = self
            .apply(&current, transition, EventKind::RequestRejected, now)
            .await?;
        info!(id, job_id = %rejected.job_id, "badge request rejected; refund owed");
        Ok(rejected)
    }

    /// Operator override: pull an approved request's `ends_at` earlier. The
    /// flag is recomputed right away; the sweeper retires the row on its next
    /// pass once `ends_at` has passed.
    #[instrument(skip(self, now))]
    pub async fn expire_early(
        &self,
        id: &str,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        let current = self.load(id).await?;
        if current.status != RequestStatus::Approved {
            return Err(BadgeError::InvalidStateTransition {
                from: current.status,
                to: RequestStatus::Expired,
            });
        }
        let (Some(starts_at), Some(current_end)) = (current.starts_at, current.ends_at) else {
            return Err(BadgeError::Corrupt(format!("{id} is approved without a window")));
        };
        let ends_at = ends_at.max(starts_at);
        if ends_at >= current_end {
            return Err(BadgeError::InvalidRequest(
                "ends_at must be earlier than the current end".into(),
            ));
        }

        if !db::shorten_window(&self.pool, id, ends_at, now).await? {
            return Err(BadgeError::ConcurrencyConflict {
                id: id.to_string(),
                expected: RequestStatus::Approved,
            });
        }
        info!(id, %ends_at, "badge window shortened by operator");

        self.projector
            .project_after_transition(&current.job_id, current.badge_type, now)
            .await;
        self.load(id).await
    }
}

/// End of a window of `duration_days` opening at `starts_at`. Out-of-range
/// durations are rejected rather than overflowing the calendar.
fn window_end(starts_at: DateTime<Utc>, duration_days: i64) -> BadgeResult<DateTime<Utc>> {
    Duration::try_days(duration_days)
        .and_then(|d| starts_at.checked_add_signed(d))
        .ok_or_else(|| {
            BadgeError::InvalidRequest(format!("duration of {duration_days} days is out of range"))
        })
}
