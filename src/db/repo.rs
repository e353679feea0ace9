use super::model::{OutboxItem, ReconciliationRow, RequestRow};
use crate::error::{BadgeError, BadgeResult};
use crate::model::{
    BadgeEvent, BadgeRequest, BadgeType, RequestFilter, RequestStatus,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

const REQUEST_COLUMNS: &str = "id, job_id, recruiter_id, company_id, badge_type, price, \
     duration_days, payment_method, payment_reference, payment_status, status, starts_at, \
     ends_at, approved_by, admin_notes, rejection_reason, created_at";

/// Rows that hold quota: every pending request plus approved ones still inside
/// their window. Binds: recruiter_id, badge_type, now.
const HOLDS_QUOTA: &str = "recruiter_id = ? AND badge_type = ? \
     AND (status = 'pending' OR (status = 'approved' AND ends_at > ?))";

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {normalized}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(std::time::Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

/// Expand a leading `~/` in a file-backed SQLite URL and create the parent
/// directory. In-memory and non-sqlite URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{path}?{q}"),
        None => format!("sqlite://{path}"),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Recruiters
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn recruiter_tier(pool: &Pool, recruiter_id: &str) -> BadgeResult<Option<String>> {
    let tier = sqlx::query_scalar::<_, String>("SELECT tier FROM recruiters WHERE recruiter_id = ?")
        .bind(recruiter_id)
        .fetch_optional(pool)
        .await?;
    Ok(tier)
}

#[instrument(skip_all)]
pub async fn set_recruiter_tier(pool: &Pool, recruiter_id: &str, tier: &str) -> BadgeResult<()> {
    sqlx::query(
        "INSERT INTO recruiters (recruiter_id, tier, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP) \
         ON CONFLICT(recruiter_id) DO UPDATE SET tier = excluded.tier, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(recruiter_id)
    .bind(tier)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Ledger reads
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn count_holding_quota<'e, E>(
    exec: E,
    recruiter_id: &str,
    badge: BadgeType,
    now: DateTime<Utc>,
) -> BadgeResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT COUNT(*) FROM badge_requests WHERE {HOLDS_QUOTA}");
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(recruiter_id)
        .bind(badge.as_str())
        .bind(now)
        .fetch_one(exec)
        .await?;
    Ok(count)
}

#[instrument(skip_all)]
pub async fn fetch_request<'e, E>(exec: E, id: &str) -> BadgeResult<Option<BadgeRequest>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM badge_requests WHERE id = ?");
    let row = sqlx::query_as::<_, RequestRow>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?;
    row.map(BadgeRequest::try_from).transpose()
}

#[instrument(skip_all)]
pub async fn list_requests(pool: &Pool, filter: &RequestFilter) -> BadgeResult<Vec<BadgeRequest>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {REQUEST_COLUMNS} FROM badge_requests WHERE 1 = 1"
    ));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(recruiter_id) = filter.recruiter_id.as_deref() {
        qb.push(" AND recruiter_id = ").push_bind(recruiter_id.to_string());
    }
    if let Some(job_id) = filter.job_id.as_deref() {
        qb.push(" AND job_id = ").push_bind(job_id.to_string());
    }
    let limit = filter
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit);

    let rows = qb.build_query_as::<RequestRow>().fetch_all(pool).await?;
    rows.into_iter().map(BadgeRequest::try_from).collect()
}

/// Approved rows whose window closed at or before `now`, oldest first.
#[instrument(skip_all)]
pub async fn overdue_request_ids(
    pool: &Pool,
    now: DateTime<Utc>,
    limit: i64,
) -> BadgeResult<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT id FROM badge_requests WHERE status = 'approved' AND ends_at <= ? \
         ORDER BY ends_at ASC LIMIT ?",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// The authoritative flag value: some approved row of this type covers `now`.
#[instrument(skip_all)]
pub async fn badge_live_for_job(
    pool: &Pool,
    job_id: &str,
    badge: BadgeType,
    now: DateTime<Utc>,
) -> BadgeResult<bool> {
    let live: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM badge_requests WHERE job_id = ? AND badge_type = ? \
         AND status = 'approved' AND starts_at <= ? AND ends_at > ?)",
    )
    .bind(job_id)
    .bind(badge.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(live)
}

/// Every (job, badge) pair the ledger or the repair queue knows about.
#[instrument(skip_all)]
pub async fn projection_targets(pool: &Pool) -> BadgeResult<Vec<(String, BadgeType)>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT job_id, badge_type FROM badge_requests \
         UNION SELECT job_id, badge_type FROM flag_reconciliations \
         ORDER BY 1, 2",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(job_id, badge)| {
            BadgeType::parse(&badge)
                .map(|b| (job_id.clone(), b))
                .ok_or_else(|| BadgeError::Corrupt(format!("job {job_id} has badge_type {badge}")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Ledger writes
// ---------------------------------------------------------------------------

/// Insert `req` as pending only if the recruiter still has quota for its
/// badge type. Count and insert are one statement, so SQLite's single writer
/// makes the admission check atomic. Returns false when the quota is full.
#[instrument(skip_all)]
pub async fn insert_request_within_quota(
    tx: &mut Transaction<'_, Sqlite>,
    req: &BadgeRequest,
    max_allowed: i64,
    now: DateTime<Utc>,
) -> BadgeResult<bool> {
    let sql = format!(
        "INSERT INTO badge_requests (id, job_id, recruiter_id, company_id, badge_type, price, \
         duration_days, payment_method, payment_reference, payment_status, status, created_at, \
         updated_at) \
         SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ? \
         WHERE (SELECT COUNT(*) FROM badge_requests WHERE {HOLDS_QUOTA}) < ?"
    );
    let res = sqlx::query(&sql)
        .bind(&req.id)
        .bind(&req.job_id)
        .bind(&req.recruiter_id)
        .bind(&req.company_id)
        .bind(req.badge_type.as_str())
        .bind(req.price)
        .bind(req.duration_days)
        .bind(req.payment_method.as_deref())
        .bind(req.payment_reference.as_deref())
        .bind(req.payment_status.as_str())
        .bind(req.created_at)
        .bind(req.created_at)
        .bind(&req.recruiter_id)
        .bind(req.badge_type.as_str())
        .bind(now)
        .bind(max_allowed)
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Field changes that travel with a status move.
#[derive(Debug, Clone)]
pub enum Transition<'a> {
    Approve {
        approver_id: &'a str,
        notes: Option<&'a str>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
    Reject {
        approver_id: &'a str,
        reason: &'a str,
    },
    /// Only applies while the row's window has closed at `as_of`.
    Expire { as_of: DateTime<Utc> },
}

impl Transition<'_> {
    pub fn from_status(&self) -> RequestStatus {
        match self {
            Transition::Approve { .. } | Transition::Reject { .. } => RequestStatus::Pending,
            Transition::Expire { .. } => RequestStatus::Approved,
        }
    }

    pub fn to_status(&self) -> RequestStatus {
        match self {
            Transition::Approve { .. } => RequestStatus::Approved,
            Transition::Reject { .. } => RequestStatus::Rejected,
            Transition::Expire { .. } => RequestStatus::Expired,
        }
    }
}

/// Compare-and-swap a request from `transition.from_status()` to
/// `transition.to_status()`. Zero affected rows means another actor moved the
/// row first (or it never matched) and yields `ConcurrencyConflict`.
#[instrument(skip_all, fields(id = %id))]
pub async fn transition(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    transition: &Transition<'_>,
    now: DateTime<Utc>,
) -> BadgeResult<()> {
    let res = match transition {
        Transition::Approve {
            approver_id,
            notes,
            starts_at,
            ends_at,
        } => {
            sqlx::query(
                "UPDATE badge_requests SET status = 'approved', approved_by = ?, admin_notes = ?, \
                 starts_at = ?, ends_at = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
            )
            .bind(*approver_id)
            .bind(*notes)
            .bind(*starts_at)
            .bind(*ends_at)
            .bind(now)
            .bind(id)
            .execute(&mut **tx)
            .await?
        }
        Transition::Reject {
            approver_id,
            reason,
        } => {
            sqlx::query(
                "UPDATE badge_requests SET status = 'rejected', approved_by = ?, \
                 rejection_reason = ?, payment_status = 'refunded', updated_at = ? \
                 WHERE id = ? AND status = 'pending'",
            )
            .bind(*approver_id)
            .bind(*reason)
            .bind(now)
            .bind(id)
            .execute(&mut **tx)
            .await?
        }
        Transition::Expire { as_of } => {
            sqlx::query(
                "UPDATE badge_requests SET status = 'expired', updated_at = ? \
                 WHERE id = ? AND status = 'approved' AND ends_at <= ?",
            )
            .bind(now)
            .bind(id)
            .bind(*as_of)
            .execute(&mut **tx)
            .await?
        }
    };

    if res.rows_affected() == 0 {
        return Err(BadgeError::ConcurrencyConflict {
            id: id.to_string(),
            expected: transition.from_status(),
        });
    }
    Ok(())
}

/// Pull `ends_at` earlier on an approved row. Returns false when the row is
/// not approved or the new end is not earlier than the current one.
#[instrument(skip_all, fields(id = %id))]
pub async fn shorten_window(
    pool: &Pool,
    id: &str,
    ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> BadgeResult<bool> {
    let res = sqlx::query(
        "UPDATE badge_requests SET ends_at = ?, updated_at = ? \
         WHERE id = ? AND status = 'approved' AND ends_at > ?",
    )
    .bind(ends_at)
    .bind(now)
    .bind(id)
    .bind(ends_at)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() == 1)
}

// ---------------------------------------------------------------------------
// Local job records
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn write_job_flag(pool: &Pool, job_id: &str, badge: BadgeType, value: bool) -> Result<()> {
    let sql = format!(
        "INSERT INTO jobs (id, {col}, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP) \
         ON CONFLICT(id) DO UPDATE SET {col} = excluded.{col}, updated_at = CURRENT_TIMESTAMP",
        col = badge.flag_field()
    );
    sqlx::query(&sql)
        .bind(job_id)
        .bind(value)
        .execute(pool)
        .await
        .context("failed to write job flag")?;
    Ok(())
}

/// `(is_urgent, is_featured)` for a job, or None if the job was never projected.
pub async fn job_flags(pool: &Pool, job_id: &str) -> Result<Option<(bool, bool)>> {
    let flags = sqlx::query_as::<_, (bool, bool)>(
        "SELECT is_urgent, is_featured FROM jobs WHERE id = ?",
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;
    Ok(flags)
}

// ---------------------------------------------------------------------------
// Repair queue
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn mark_for_reconciliation(
    pool: &Pool,
    job_id: &str,
    badge: BadgeType,
    error: &str,
    now: DateTime<Utc>,
) -> BadgeResult<()> {
    sqlx::query(
        "INSERT INTO flag_reconciliations (job_id, badge_type, last_error, attempts, flagged_at) \
         VALUES (?, ?, ?, 1, ?) \
         ON CONFLICT(job_id, badge_type) DO UPDATE SET last_error = excluded.last_error, \
         attempts = attempts + 1, flagged_at = excluded.flagged_at",
    )
    .bind(job_id)
    .bind(badge.as_str())
    .bind(error)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn clear_reconciliation(pool: &Pool, job_id: &str, badge: BadgeType) -> BadgeResult<()> {
    sqlx::query("DELETE FROM flag_reconciliations WHERE job_id = ? AND badge_type = ?")
        .bind(job_id)
        .bind(badge.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_reconciliations(pool: &Pool) -> BadgeResult<Vec<ReconciliationRow>> {
    let rows = sqlx::query_as::<_, ReconciliationRow>(
        "SELECT job_id, badge_type, last_error, attempts, flagged_at \
         FROM flag_reconciliations ORDER BY flagged_at ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Event outbox
// ---------------------------------------------------------------------------

pub async fn enqueue_event_tx(
    tx: &mut Transaction<'_, Sqlite>,
    event: &BadgeEvent,
    due_at: DateTime<Utc>,
) -> BadgeResult<i64> {
    let payload = serde_json::to_string(event)
        .map_err(|err| BadgeError::Corrupt(format!("unserializable event: {err}")))?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO badge_events (request_id, kind, payload, attempt, due_at) \
         VALUES (?, ?, ?, 0, ?) RETURNING id",
    )
    .bind(&event.request_id)
    .bind(event.kind.as_str())
    .bind(payload)
    .bind(due_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn next_due_event(pool: &Pool, now: DateTime<Utc>) -> Result<Option<OutboxItem>> {
    let item = sqlx::query_as::<_, OutboxItem>(
        "SELECT id, request_id, kind, payload, attempt FROM badge_events \
         WHERE due_at <= ? ORDER BY due_at ASC, id ASC LIMIT 1",
    )
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(item)
}

#[instrument(skip_all)]
pub async fn delete_event(pool: &Pool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM badge_events WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Exponential backoff: 5s * 2^attempt, capped at `max_cap_secs` (no cap when <= 0).
#[instrument(skip_all)]
pub async fn backoff_event_with_cap(
    pool: &Pool,
    id: i64,
    attempt: i32,
    max_cap_secs: i64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let secs = 5_i64 * (1_i64 << attempt.clamp(0, 10));
    let secs = if max_cap_secs <= 0 {
        secs
    } else {
        secs.min(max_cap_secs)
    };
    let due_at = now + Duration::seconds(secs);
    sqlx::query("UPDATE badge_events SET attempt = ?, due_at = ? WHERE id = ?")
        .bind(attempt + 1)
        .bind(due_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(due_at)
}

pub async fn count_pending_events(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badge_events")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PaymentStatus, RequestStatus};

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn pending(id: &str, recruiter: &str, badge: BadgeType, now: DateTime<Utc>) -> BadgeRequest {
        BadgeRequest {
            id: id.into(),
            job_id: format!("job-{id}"),
            recruiter_id: recruiter.into(),
            company_id: "acme".into(),
            badge_type: badge,
            price: 100,
            duration_days: 7,
            payment_method: Some("card".into()),
            payment_reference: Some(format!("pay-{id}")),
            payment_status: PaymentStatus::Completed,
            status: RequestStatus::Pending,
            starts_at: None,
            ends_at: None,
            approved_by: None,
            admin_notes: None,
            rejection_reason: None,
            created_at: now,
        }
    }

    #[test]
    fn sqlite_url_normalization() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            prepare_sqlite_url("postgres://db/x"),
            "postgres://db/x"
        );
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested/badges.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        assert_eq!(prepare_sqlite_url(&url), url);
        assert!(td.path().join("nested").exists());
    }

    #[tokio::test]
    async fn insert_respects_quota_in_one_statement() {
        let pool = setup_pool().await;
        let now = Utc::now();

        let mut tx = pool.begin().await.unwrap();
        assert!(insert_request_within_quota(&mut tx, &pending("a", "r1", BadgeType::Urgent, now), 1, now)
            .await
            .unwrap());
        assert!(!insert_request_within_quota(&mut tx, &pending("b", "r1", BadgeType::Urgent, now), 1, now)
            .await
            .unwrap());
        // other badge types and recruiters have their own budget
        assert!(insert_request_within_quota(&mut tx, &pending("c", "r1", BadgeType::Featured, now), 1, now)
            .await
            .unwrap());
        assert!(insert_request_within_quota(&mut tx, &pending("d", "r2", BadgeType::Urgent, now), 1, now)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        assert_eq!(count_holding_quota(&pool, "r1", BadgeType::Urgent, now).await.unwrap(), 1);
        assert!(fetch_request(&pool, "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transition_is_compare_and_swap() {
        let pool = setup_pool().await;
        let now = Utc::now();
        let mut tx = pool.begin().await.unwrap();
        insert_request_within_quota(&mut tx, &pending("a", "r1", BadgeType::Urgent, now), 5, now)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let approve = Transition::Approve {
            approver_id: "admin",
            notes: Some("ok"),
            starts_at: now,
            ends_at: now + Duration::days(7),
        };
        let mut tx = pool.begin().await.unwrap();
        transition(&mut tx, "a", &approve, now).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let err = transition(&mut tx, "a", &approve, now).await.unwrap_err();
        assert!(matches!(
            err,
            BadgeError::ConcurrencyConflict { expected: RequestStatus::Pending, .. }
        ));
        // not overdue yet
        let err = transition(&mut tx, "a", &Transition::Expire { as_of: now }, now)
            .await
            .unwrap_err();
        assert!(matches!(err, BadgeError::ConcurrencyConflict { .. }));
        tx.rollback().await.unwrap();

        let stored = fetch_request(&pool, "a").await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert_eq!(stored.approved_by.as_deref(), Some("admin"));
        assert!(badge_live_for_job(&pool, "job-a", BadgeType::Urgent, now).await.unwrap());
        assert!(!badge_live_for_job(&pool, "job-a", BadgeType::Featured, now).await.unwrap());
    }

    #[tokio::test]
    async fn event_backoff_pushes_due_at() {
        let pool = setup_pool().await;
        let now = Utc::now();
        let req = pending("a", "r1", BadgeType::Urgent, now);
        let event = BadgeEvent::for_request(crate::model::EventKind::RequestCreated, &req, now);
        let mut tx = pool.begin().await.unwrap();
        let id = enqueue_event_tx(&mut tx, &event, now).await.unwrap();
        tx.commit().await.unwrap();

        let item = next_due_event(&pool, now).await.unwrap().unwrap();
        assert_eq!(item.id, id);
        assert_eq!(item.kind, "request_created");

        let due = backoff_event_with_cap(&pool, id, item.attempt, 60, now).await.unwrap();
        assert_eq!(due, now + Duration::seconds(5));
        assert!(next_due_event(&pool, now).await.unwrap().is_none());
        assert!(next_due_event(&pool, due).await.unwrap().is_some());

        delete_event(&pool, id).await.unwrap();
        assert_eq!(count_pending_events(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn job_flags_upsert_per_column() {
        let pool = setup_pool().await;
        assert!(job_flags(&pool, "j1").await.unwrap().is_none());
        write_job_flag(&pool, "j1", BadgeType::Featured, true).await.unwrap();
        assert_eq!(job_flags(&pool, "j1").await.unwrap(), Some((false, true)));
        write_job_flag(&pool, "j1", BadgeType::Urgent, true).await.unwrap();
        write_job_flag(&pool, "j1", BadgeType::Featured, false).await.unwrap();
        assert_eq!(job_flags(&pool, "j1").await.unwrap(), Some((true, false)));
    }
}
