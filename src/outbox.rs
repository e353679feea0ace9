//! Delivery of badge state-change events to the notification layer.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::db::{self, Pool};
use crate::model::{BadgeEvent, EventKind};

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &BadgeEvent) -> Result<()>;
}

/// Emits each event as a structured log line.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn publish(&self, event: &BadgeEvent) -> Result<()> {
        info!(
            kind = event.kind.as_str(),
            request_id = %event.request_id,
            job_id = %event.job_id,
            recruiter_id = %event.recruiter_id,
            badge = %event.badge_type,
            status = %event.status,
            reason = event.reason.as_deref().unwrap_or(""),
            "badge event"
        );
        Ok(())
    }
}

/// POSTs each event as JSON to a notification service.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    http: Client,
    url: Url,
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).context("invalid webhook url")?;
        let http = Client::builder()
            .user_agent("badge-engine/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build webhook client")?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    async fn publish(&self, event: &BadgeEvent) -> Result<()> {
        let res = self
            .http
            .post(self.url.clone())
            .json(event)
            .send()
            .await
            .context("failed to reach notification webhook")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("webhook error {}: {}", status, body));
        }
        Ok(())
    }
}

pub fn sink_from_config(cfg: &Config) -> Result<Arc<dyn EventSink>> {
    match cfg.notifications.webhook_url.as_deref() {
        Some(url) => Ok(Arc::new(WebhookSink::new(url)?)),
        None => Ok(Arc::new(LogSink)),
    }
}

/// Deliver the oldest due event. Returns false when nothing was due.
#[instrument(skip_all)]
pub async fn process_next_event(
    pool: &Pool,
    sink: &dyn EventSink,
    max_backoff_secs: i64,
) -> Result<bool> {
    let now = Utc::now();
    let Some(item) = db::next_due_event(pool, now).await? else {
        return Ok(false);
    };

    let decoded = match EventKind::parse(&item.kind) {
        Some(_) => serde_json::from_str::<BadgeEvent>(&item.payload).map_err(anyhow::Error::from),
        None => Err(anyhow!("unknown event kind")),
    };
    let event = match decoded {
        Ok(event) => event,
        Err(err) => {
            // Retrying cannot fix a payload that does not parse.
            warn!(?err, id = item.id, kind = %item.kind, "dropping undecodable badge event");
            db::delete_event(pool, item.id).await?;
            return Ok(true);
        }
    };

    match sink.publish(&event).await {
        Ok(()) => {
            db::delete_event(pool, item.id).await?;
            info!(id = item.id, kind = %item.kind, request_id = %item.request_id, "badge event delivered");
        }
        Err(err) => {
            let due_at =
                db::backoff_event_with_cap(pool, item.id, item.attempt, max_backoff_secs, now)
                    .await?;
            warn!(
                ?err,
                id = item.id,
                kind = %item.kind,
                attempt = item.attempt,
                %due_at,
                "badge event delivery failed; backoff"
            );
        }
    }
    Ok(true)
}
