//! Configuration loader and validator for the badge engine.
use crate::model::{BadgeType, MAX_DURATION_DAYS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub server: Server,
    pub sweep: Sweep,
    pub projection: Projection,
    pub quota: Quota,
    pub job_board: JobBoardConfig,
    #[serde(default)]
    pub notifications: Notifications,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Outbox worker idle sleep.
    pub poll_interval_ms: u64,
    pub max_backoff_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sweep {
    pub interval_seconds: u64,
    /// Budget for expiring one row, projection included.
    pub row_timeout_ms: u64,
    pub batch_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Projection {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

/// Per-tier admission limits. The tier of a recruiter is looked up in the
/// ledger database; unknown recruiters fall back to `default_tier`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quota {
    pub default_tier: String,
    pub tiers: BTreeMap<String, TierLimits>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierLimits {
    pub urgent: QuotaRule,
    pub featured: QuotaRule,
}

impl TierLimits {
    pub fn rule(&self, badge: BadgeType) -> QuotaRule {
        match badge {
            BadgeType::Urgent => self.urgent,
            BadgeType::Featured => self.featured,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaRule {
    pub max_active: i64,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobBoardKind {
    Local,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobBoardConfig {
    pub kind: JobBoardKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notifications {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// `DATABASE_URL` wins over the file under `app.data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/badges.db", self.app.data_dir))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.server.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.server.port));
        }
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::Invalid("server.host must be an IP address or localhost"))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

impl Sweep {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn row_timeout(&self) -> Duration {
        Duration::from_millis(self.row_timeout_ms)
    }
}

impl Projection {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Total sleep across all retries of one flag write (linear backoff).
    pub fn retry_budget(&self) -> Duration {
        let steps = u64::from(self.max_attempts.saturating_sub(1));
        let units = steps * (steps + 1) / 2;
        Duration::from_millis(self.retry_delay_ms.saturating_mul(units))
    }
}

impl Quota {
    /// Limits for `tier`, or for the default tier when `tier` is absent.
    pub fn limits_for(&self, tier: Option<&str>) -> Option<&TierLimits> {
        self.tiers.get(tier.unwrap_or(self.default_tier.as_str()))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }

    if cfg.sweep.interval_seconds == 0 {
        return Err(ConfigError::Invalid("sweep.interval_seconds must be > 0"));
    }
    if cfg.sweep.row_timeout_ms == 0 {
        return Err(ConfigError::Invalid("sweep.row_timeout_ms must be > 0"));
    }
    if cfg.sweep.batch_limit <= 0 {
        return Err(ConfigError::Invalid("sweep.batch_limit must be > 0"));
    }

    if cfg.projection.max_attempts == 0 {
        return Err(ConfigError::Invalid("projection.max_attempts must be > 0"));
    }
    if cfg.sweep.row_timeout() < cfg.projection.retry_budget() {
        return Err(ConfigError::Invalid(
            "sweep.row_timeout_ms must cover the projection retry backoff",
        ));
    }

    if cfg.quota.tiers.is_empty() {
        return Err(ConfigError::Invalid("quota.tiers must define at least one tier"));
    }
    if !cfg.quota.tiers.contains_key(&cfg.quota.default_tier) {
        return Err(ConfigError::Invalid("quota.default_tier must name a configured tier"));
    }
    for limits in cfg.quota.tiers.values() {
        for badge in BadgeType::ALL {
            let rule = limits.rule(badge);
            if rule.max_active < 0 {
                return Err(ConfigError::Invalid("quota max_active must be >= 0"));
            }
            if !(1..=MAX_DURATION_DAYS).contains(&rule.duration_days) {
                return Err(ConfigError::Invalid("quota duration_days must be in 1..=3650"));
            }
        }
    }

    if cfg.job_board.kind == JobBoardKind::Http {
        let url = cfg.job_board.base_url.as_deref().unwrap_or("");
        if url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "job_board.base_url must be set when job_board.kind is http",
            ));
        }
    }

    if let Some(url) = cfg.notifications.webhook_url.as_deref() {
        if url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "notifications.webhook_url must be non-empty when present",
            ));
        }
    }

    Ok(())
}

/// Returns the example YAML shipped with the service.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_ms: 500
  max_backoff_seconds: 600

server:
  host: "127.0.0.1"
  port: 8080

sweep:
  interval_seconds: 3600
  row_timeout_ms: 5000
  batch_limit: 500

projection:
  max_attempts: 3
  retry_delay_ms: 200

quota:
  default_tier: "basic"
  tiers:
    basic:
      urgent: { max_active: 1, duration_days: 7 }
      featured: { max_active: 1, duration_days: 30 }
    premium:
      urgent: { max_active: 5, duration_days: 7 }
      featured: { max_active: 5, duration_days: 30 }

job_board:
  kind: local

notifications:
  webhook_url: null
"#
}
