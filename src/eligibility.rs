//! Per-recruiter admission control for badge purchases.
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

use crate::config::{Quota, TierLimits};
use crate::db::{self, Pool};
use crate::error::{BadgeError, BadgeResult};
use crate::model::{BadgeType, Eligibility};

#[derive(Debug, Clone)]
pub struct EligibilityGuard {
    pool: Pool,
    quota: Arc<Quota>,
}

impl EligibilityGuard {
    pub fn new(pool: Pool, quota: Arc<Quota>) -> Self {
        Self { pool, quota }
    }

    /// Limits for the recruiter's account tier.
    #[instrument(skip(self))]
    pub async fn limits_for(&self, recruiter_id: &str) -> BadgeResult<TierLimits> {
        let tier = db::recruiter_tier(&self.pool, recruiter_id).await?;
        self.quota
            .limits_for(tier.as_deref())
            .copied()
            .ok_or_else(|| BadgeError::UnknownTier(tier.unwrap_or_default()))
    }

    /// Read-only view of the recruiter's quota. Never used to authorize a
    /// write: `ledger::RequestLedger::create` re-checks inside its insert.
    #[instrument(skip(self, now))]
    pub async fn check(
        &self,
        recruiter_id: &str,
        badge: BadgeType,
        now: DateTime<Utc>,
    ) -> BadgeResult<Eligibility> {
        let max_allowed = self.limits_for(recruiter_id).await?.rule(badge).max_active;
        let active = db::count_holding_quota(&self.pool, recruiter_id, badge, now).await?;
        Ok(Eligibility::from_counts(active, max_allowed))
    }

    #[instrument(skip(self))]
    pub async fn set_recruiter_tier(&self, recruiter_id: &str, tier: &str) -> BadgeResult<()> {
        if recruiter_id.trim().is_empty() {
            return Err(BadgeError::InvalidRequest("recruiter_id must be non-empty".into()));
        }
        if !self.quota.tiers.contains_key(tier) {
            return Err(BadgeError::UnknownTier(tier.to_string()));
        }
        db::set_recruiter_tier(&self.pool, recruiter_id, tier).await
    }
}
