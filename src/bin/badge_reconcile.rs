use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use badge_engine::{config, db, job_board, BadgeEngine};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Recompute every job's promotion flags from the badge ledger and exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Exit non-zero if any flag could not be written
    #[arg(long)]
    strict: bool,
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

    let queued = db::list_reconciliations(&pool).await?;
    info!(queued = queued.len(), "starting flag reconciliation");
    for row in &queued {
        info!(
            job_id = %row.job_id,
            badge = %row.badge_type,
            attempts = row.attempts,
            flagged_at = %row.flagged_at,
            last_error = %row.last_error,
            "queued for repair"
        );
    }

    let board = job_board::from_config(&cfg, &pool)?;
    let engine = BadgeEngine::new(pool, &cfg, board);
    let report = engine.reconcile(Utc::now()).await?;
    println!("{}", serde_json::to_string(&report)?);

    if report.failed > 0 {
        warn!(failed = report.failed, "some flags are still out of sync");
        if args.strict {
            anyhow::bail!("{} flag(s) could not be reconciled", report.failed);
        }
    }
    Ok(())
}
