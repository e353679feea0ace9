//! Wiring of the promotion lifecycle components behind one handle.
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::approval::ApprovalGate;
use crate::config::Config;
use crate::db::Pool;
use crate::eligibility::EligibilityGuard;
use crate::error::BadgeResult;
use crate::job_board::JobBoard;
use crate::ledger::RequestLedger;
use crate::model::{
    BadgeRequest, BadgeType, Eligibility, NewBadgeRequest, ReconcileReport, RequestFilter,
    SweepReport,
};
use crate::projector::JobFlagProjector;
use crate::sweeper::ExpirySweeper;

/// Every operation takes `now` explicitly; callers at the edge pass the wall
/// clock.
#[derive(Clone)]
pub struct BadgeEngine {
    guard: EligibilityGuard,
    ledger: RequestLedger,
    gate: ApprovalGate,
    sweeper: ExpirySweeper,
    projector: JobFlagProjector,
}

impl BadgeEngine {
    pub fn new(pool: Pool, cfg: &Config, board: Arc<dyn JobBoard>) -> Self {
        let guard = EligibilityGuard::new(pool.clone(), Arc::new(cfg.quota.clone()));
        let projector = JobFlagProjector::new(pool.clone(), board, &cfg.projection);
        Self {
            ledger: RequestLedger::new(pool.clone(), guard.clone()),
            gate: ApprovalGate::new(pool.clone(), projector.clone()),
            sweeper: ExpirySweeper::new(pool, projector.clone(), &cfg.sweep),
            guard,
            projector,
        }
    }

    pub fn sweeper(&self) -> &ExpirySweeper {
        &self.sweeper
    }

    pub async fn check_eligibility(
        &self,
        recruiter_id: &str,
        badge: BadgeType,
        now: DateTime<Utc>,
    ) -> BadgeResult<Eligibility> {
        self.guard.check(recruiter_id, badge, now).await
    }

    pub async fn set_recruiter_tier(&self, recruiter_id: &str, tier: &str) -> BadgeResult<()> {
        self.guard.set_recruiter_tier(recruiter_id, tier).await
    }

    pub async fn create_request(
        &self,
        new: NewBadgeRequest,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        self.ledger.create(new, now).await
    }

    pub async fn get_request(&self, id: &str) -> BadgeResult<BadgeRequest> {
        self.ledger.get(id).await
    }

    pub async fn list_requests(&self, filter: &RequestFilter) -> BadgeResult<Vec<BadgeRequest>> {
        self.ledger.list(filter).await
    }

    pub async fn approve_request(
        &self,
        id: &str,
        approver_id: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        self.gate.approve(id, approver_id, notes, now).await
    }

    pub async fn reject_request(
        &self,
        id: &str,
        approver_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        self.gate.reject(id, approver_id, reason, now).await
    }

    pub async fn expire_early(
        &self,
        id: &str,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> BadgeResult<BadgeRequest> {
        self.gate.expire_early(id, ends_at, now).await
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        self.sweeper.sweep(now).await
    }

    pub async fn recompute_flag(
        &self,
        job_id: &str,
        badge: BadgeType,
        now: DateTime<Utc>,
    ) -> BadgeResult<bool> {
        self.projector.recompute(job_id, badge, now).await
    }

    pub async fn reconcile(&self, now: DateTime<Utc>) -> BadgeResult<ReconcileReport> {
        self.projector.reconcile(now).await
    }
}
