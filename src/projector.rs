//! Projects ledger state onto the job's denormalized promotion flags.
//!
//! The ledger is the source of truth. A flag is always recomputed from the
//! ledger at `now`, never toggled from what the caller believes changed, so
//! re-running `recompute` for every job repairs any drift.
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::config::Projection;
use crate::db::{self, Pool};
use crate::error::{BadgeError, BadgeResult};
use crate::job_board::JobBoard;
use crate::model::{BadgeType, ReconcileReport};

const RECONCILE_CONCURRENCY: usize = 8;

type FlagKey = (String, BadgeType);

#[derive(Clone)]
pub struct JobFlagProjector {
    pool: Pool,
    board: Arc<dyn JobBoard>,
    max_attempts: u32,
    retry_delay: Duration,
    // One slot per (job, badge) with a recompute in flight.
    in_flight: Arc<Mutex<HashMap<FlagKey, Arc<Mutex<()>>>>>,
}

impl JobFlagProjector {
    pub fn new(pool: Pool, board: Arc<dyn JobBoard>, cfg: &Projection) -> Self {
        Self {
            pool,
            board,
            max_attempts: cfg.max_attempts.max(1),
            retry_delay: cfg.retry_delay(),
            in_flight: Arc::default(),
        }
    }

    /// Re-derive the flag for `(job_id, badge)` at `now` and write it.
    /// Returns the value written.
    ///
    /// Recomputes of the same pair run one at a time, read through write, so
    /// the last write always comes from a read that saw every transition
    /// committed before it started.
    #[instrument(skip(self, now))]
    pub async fn recompute(
        &self,
        job_id: &str,
        badge: BadgeType,
        now: DateTime<Utc>,
    ) -> BadgeResult<bool> {
        let key: FlagKey = (job_id.to_string(), badge);
        let slot = self
            .in_flight
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone();
        let result = {
            let _held = slot.lock().await;
            self.read_and_write(job_id, badge, now).await
        };
        drop(slot);

        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(&key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            in_flight.remove(&key);
        }
        result
    }

    async fn read_and_write(
        &self,
        job_id: &str,
        badge: BadgeType,
        now: DateTime<Utc>,
    ) -> BadgeResult<bool> {
        let live = db::badge_live_for_job(&self.pool, job_id, badge, now).await?;

        let mut last_err = None;
        for attempt in 1..=self.max_attempts {
            match self.board.set_flag(job_id, badge, live).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(job_id, %badge, attempt, "job flag written after retry");
                    }
                    return Ok(live);
                }
                Err(err) => {
                    warn!(?err, job_id, %badge, attempt, "job flag write failed");
                    last_err = Some(err);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        Err(BadgeError::ProjectionFailed {
            job_id: job_id.to_string(),
            badge_type: badge,
            message: last_err
                .map(|e| format!("{e:#}"))
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }

    /// Recompute after a ledger transition. The transition already committed
    /// and stays authoritative: on failure the pair is queued for
    /// reconciliation instead of surfacing the error.
    pub async fn project_after_transition(
        &self,
        job_id: &str,
        badge: BadgeType,
        now: DateTime<Utc>,
    ) -> Option<bool> {
        match self.recompute(job_id, badge, now).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%err, job_id, %badge, "projection deferred to reconciliation");
                if let Err(mark_err) =
                    db::mark_for_reconciliation(&self.pool, job_id, badge, &err.to_string(), now)
                        .await
                {
                    warn!(%mark_err, job_id, %badge, "failed to queue flag reconciliation");
                }
                None
            }
        }
    }

    /// Recompute every (job, badge) known to the ledger or the repair queue.
    #[instrument(skip_all)]
    pub async fn reconcile(&self, now: DateTime<Utc>) -> BadgeResult<ReconcileReport> {
        let queued: Vec<(String, String)> = db::list_reconciliations(&self.pool)
            .await?
            .into_iter()
            .map(|row| (row.job_id, row.badge_type))
            .collect();
        let targets = db::projection_targets(&self.pool).await?;

        let outcomes: Vec<(String, BadgeType, BadgeResult<bool>)> = stream::iter(targets)
            .map(|(job_id, badge)| async move {
                let res = self.recompute(&job_id, badge, now).await;
                (job_id, badge, res)
            })
            .buffer_unordered(RECONCILE_CONCURRENCY)
            .collect()
            .await;

        let mut report = ReconcileReport::default();
        for (job_id, badge, res) in outcomes {
            report.checked += 1;
            let was_queued = queued
                .iter()
                .any(|(j, b)| j == &job_id && b == badge.as_str());
            match res {
                Ok(_) => {
                    if was_queued {
                        db::clear_reconciliation(&self.pool, &job_id, badge).await?;
                        report.repaired += 1;
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    db::mark_for_reconciliation(&self.pool, &job_id, badge, &err.to_string(), now)
                        .await?;
                }
            }
        }

        info!(
            checked = report.checked,
            repaired = report.repaired,
            failed = report.failed,
            "flag reconciliation finished"
        );
        Ok(report)
    }
}
