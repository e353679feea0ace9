//! Periodic retirement of approved badges whose window has closed.
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::config::Sweep;
use crate::db::{self, Pool, Transition};
use crate::error::{BadgeError, BadgeResult};
use crate::model::{BadgeEvent, BadgeRequest, EventKind, RequestStatus, SweepReport};
use crate::projector::JobFlagProjector;

#[derive(Clone)]
pub struct ExpirySweeper {
    pool: Pool,
    projector: JobFlagProjector,
    row_timeout: Duration,
    batch_limit: i64,
}

enum RowOutcome {
    Expired(BadgeRequest),
    AlreadyHandled,
}

impl ExpirySweeper {
    pub fn new(pool: Pool, projector: JobFlagProjector, cfg: &Sweep) -> Self {
        Self {
            pool,
            projector,
            row_timeout: cfg.row_timeout(),
            batch_limit: cfg.batch_limit,
        }
    }

    /// Expire every approved row with `ends_at <= now`.
    ///
    /// Each row is its own compare-and-swap, so overlapping sweeps (or a
    /// manual run racing the scheduled one) expire a row at most once. Row
    /// failures are logged and skipped; the next pass picks them up.
    #[instrument(skip_all, fields(now = %now))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        loop {
            let ids = match db::overdue_request_ids(&self.pool, now, self.batch_limit).await {
                Ok(ids) => ids,
                Err(err) => {
                    error!(%err, "failed to select overdue badge requests");
                    break;
                }
            };
            if ids.is_empty() {
                break;
            }

            let mut progressed = 0_usize;
            for id in &ids {
                // The row budget covers the transition only. Projection of a
                // committed row always runs.
                match tokio::time::timeout(self.row_timeout, self.expire_row(id, now)).await {
                    Ok(Ok(RowOutcome::Expired(expired))) => {
                        report.expired_count += 1;
                        progressed += 1;
                        self.projector
                            .project_after_transition(&expired.job_id, expired.badge_type, now)
                            .await;
                    }
                    Ok(Ok(RowOutcome::AlreadyHandled)) => progressed += 1,
                    Ok(Err(err)) => warn!(%err, id = %id, "failed to expire badge request"),
                    Err(_) => {
                        warn!(id = %id, "expiring badge request timed out");
                        self.project_if_expired(id, now).await;
                    }
                }
            }

            // A short page means everything overdue was seen; a page where no
            // row moved would just be re-selected forever.
            if (ids.len() as i64) < self.batch_limit || progressed == 0 {
                break;
            }
        }

        info!(expired_count = report.expired_count, "expiry sweep finished");
        report
    }

    async fn expire_row(&self, id: &str, now: DateTime<Utc>) -> BadgeResult<RowOutcome> {
        let mut tx = self.pool.begin().await?;
        match db::transition(&mut tx, id, &Transition::Expire { as_of: now }, now).await {
            Ok(()) => {}
            Err(BadgeError::ConcurrencyConflict { .. }) => return Ok(RowOutcome::AlreadyHandled),
            Err(err) => return Err(err),
        }
        let expired = db::fetch_request(&mut *tx, id)
            .await?
            .ok_or_else(|| BadgeError::RequestNotFound(id.to_string()))?;
        let event = BadgeEvent::for_request(EventKind::RequestExpired, &expired, now);
        db::enqueue_event_tx(&mut tx, &event, now).await?;
        tx.commit().await?;

        info!(id, job_id = %expired.job_id, badge = %expired.badge_type, "badge request expired");
        Ok(RowOutcome::Expired(expired))
    }

    /// A timed-out row may still have committed. Recompute its flag when it
    /// did; the recompute is idempotent if another pass already did it.
    async fn project_if_expired(&self, id: &str, now: DateTime<Utc>) {
        match db::fetch_request(&self.pool, id).await {
            Ok(Some(row)) if row.status == RequestStatus::Expired => {
                self.projector
                    .project_after_transition(&row.job_id, row.badge_type, now)
                    .await;
            }
            Ok(_) => {}
            Err(err) => warn!(%err, id = %id, "failed to re-read timed out badge request"),
        }
    }

    /// Sweep on a fixed cadence until `shutdown` resolves. The first pass runs
    /// immediately so a restart catches up on anything missed while down.
    pub async fn run<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("expiry sweeper stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.sweep(Utc::now()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, Config};
    use crate::engine::BadgeEngine;
    use crate::job_board::SqliteJobBoard;
    use crate::model::{BadgeType, NewBadgeRequest, PaymentFacts, PaymentStatus, RequestStatus};
    use std::sync::Arc;

    async fn setup(batch_limit: i64) -> (Pool, BadgeEngine) {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let mut cfg: Config = serde_yaml::from_str(config::example()).unwrap();
        cfg.sweep.batch_limit = batch_limit;
        cfg.projection.retry_delay_ms = 1;
        let engine = BadgeEngine::new(pool.clone(), &cfg, Arc::new(SqliteJobBoard::new(pool.clone())));
        (pool, engine)
    }

    fn request(job: &str) -> NewBadgeRequest {
        NewBadgeRequest {
            job_id: job.into(),
            recruiter_id: "rec-1".into(),
            company_id: "acme".into(),
            badge_type: BadgeType::Featured,
            price: 100,
            duration_days: Some(1),
            payment: PaymentFacts {
                method: None,
                reference: None,
                status: PaymentStatus::Completed,
            },
        }
    }

    #[tokio::test]
    async fn sweep_pages_through_every_overdue_row() {
        let (pool, engine) = setup(2).await;
        engine.set_recruiter_tier("rec-1", "premium").await.unwrap();
        let then = Utc::now() - chrono::Duration::days(3);
        for i in 0..5 {
            let req = engine.create_request(request(&format!("job-{i}")), then).await.unwrap();
            engine.approve_request(&req.id, "admin", None, then).await.unwrap();
        }

        let report = engine.sweep(Utc::now()).await;
        assert_eq!(report.expired_count, 5);
        let expired = db::list_requests(
            &pool,
            &crate::model::RequestFilter {
                status: Some(RequestStatus::Expired),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(expired.len(), 5);
    }

    #[tokio::test]
    async fn pending_rows_are_never_swept() {
        let (_pool, engine) = setup(10).await;
        let then = Utc::now() - chrono::Duration::days(30);
        let req = engine.create_request(request("job-1"), then).await.unwrap();
        assert_eq!(engine.sweep(Utc::now()).await.expired_count, 0);
        assert_eq!(
            engine.get_request(&req.id).await.unwrap().status,
            RequestStatus::Pending
        );
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (_pool, engine) = setup(10).await;
        let sweeper = engine.sweeper().clone();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            sweeper
                .run(Duration::from_secs(3600), async move {
                    let _ = rx.await;
                })
                .await;
        });
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
