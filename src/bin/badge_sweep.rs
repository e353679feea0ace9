use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use badge_engine::{config, db, job_board, BadgeEngine};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run one expiry sweep over approved badges and exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Sweep as of this RFC 3339 instant instead of the wall clock
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let board = job_board::from_config(&cfg, &pool)?;
    let engine = BadgeEngine::new(pool, &cfg, board);

    let now = args.now.unwrap_or_else(Utc::now);
    let report = engine.sweep(now).await;
    info!(expired_count = report.expired_count, %now, "manual sweep complete");
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
