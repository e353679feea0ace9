//! Write access to the promotion flags on job postings.
//!
//! The job record belongs to the job-posting subsystem. The engine only ever
//! flips `is_urgent` / `is_featured`, through a `JobBoard`.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::{Config, JobBoardKind};
use crate::db::{self, Pool};
use crate::model::BadgeType;

#[async_trait]
pub trait JobBoard: Send + Sync {
    async fn set_flag(&self, job_id: &str, badge: BadgeType, value: bool) -> Result<()>;
}

/// Job records kept in the engine's own database.
#[derive(Debug, Clone)]
pub struct SqliteJobBoard {
    pool: Pool,
}

impl SqliteJobBoard {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobBoard for SqliteJobBoard {
    async fn set_flag(&self, job_id: &str, badge: BadgeType, value: bool) -> Result<()> {
        db::write_job_flag(&self.pool, job_id, badge, value).await
    }
}

/// Job records owned by a remote job-listing service.
#[derive(Clone)]
pub struct HttpJobBoard {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpJobBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpJobBoard")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpJobBoard {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).context("invalid job board base url")?;
        let http = Client::builder()
            .user_agent("badge-engine/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build job board client")?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn job_url(&self, job_id: &str) -> Result<Url> {
        self.base_url
            .join(&format!("jobs/{job_id}"))
            .context("invalid job id for url")
    }
}

pub fn build_flag_patch(badge: BadgeType, value: bool) -> Value {
    let mut body = Map::new();
    body.insert(badge.flag_field().to_string(), json!(value));
    Value::Object(body)
}

#[async_trait]
impl JobBoard for HttpJobBoard {
    async fn set_flag(&self, job_id: &str, badge: BadgeType, value: bool) -> Result<()> {
        let url = self.job_url(job_id)?;
        let body = build_flag_patch(badge, value);
        debug!(%url, payload = %body, "patching job flag");

        let mut req = self.http.patch(url).json(&body);
        if let Some(token) = self.token.as_deref() {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.context("failed to reach job board")?;

        if res.status() == StatusCode::NOT_FOUND {
            return Err(anyhow!("job {job_id} not found on job board"));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("job board error {}: {}", status, body));
        }
        Ok(())
    }
}

pub fn from_config(cfg: &Config, pool: &Pool) -> Result<Arc<dyn JobBoard>> {
    match cfg.job_board.kind {
        JobBoardKind::Local => Ok(Arc::new(SqliteJobBoard::new(pool.clone()))),
        JobBoardKind::Http => {
            let base = cfg
                .job_board
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow!("job_board.base_url is required for kind http"))?;
            Ok(Arc::new(HttpJobBoard::new(base, cfg.job_board.token.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_body_names_one_flag() {
        assert_eq!(
            build_flag_patch(BadgeType::Urgent, true),
            json!({ "is_urgent": true })
        );
        assert_eq!(
            build_flag_patch(BadgeType::Featured, false),
            json!({ "is_featured": false })
        );
    }

    #[test]
    fn job_url_keeps_base_path() {
        let board = HttpJobBoard::new("https://jobs.example.com/api/v2", None).unwrap();
        assert_eq!(
            board.job_url("job-42").unwrap().as_str(),
            "https://jobs.example.com/api/v2/jobs/job-42"
        );
    }
}
