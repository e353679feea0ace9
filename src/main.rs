use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use badge_engine::{api, config, db, job_board, outbox, BadgeEngine};

#[derive(Debug, Parser)]
#[command(author, version, about = "Job promotion badge lifecycle service")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Serve the API without the background expiry sweeper
    #[arg(long)]
    no_sweeper: bool,
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
    let engine = Arc::new(BadgeEngine::new(pool.clone(), &cfg, board));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Outbox worker (single consumer)
    let sink = outbox::sink_from_config(&cfg)?;
    let worker_pool = pool.clone();
    let poll_sleep = Duration::from_millis(cfg.app.poll_interval_ms);
    let max_backoff = cfg.app.max_backoff_seconds as i64;
    let mut worker_shutdown = shutdown_rx.clone();
    let outbox_task = tokio::spawn(async move {
        loop {
            if *worker_shutdown.borrow() {
                break;
            }
            match outbox::process_next_event(&worker_pool, sink.as_ref(), max_backoff).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => error!(?err, "outbox worker error"),
            }
            tokio::select! {
                _ = worker_shutdown.changed() => break,
                _ = tokio::time::sleep(poll_sleep) => {}
            }
        }
    });

    let sweeper_task = if args.no_sweeper {
        None
    } else {
        let sweeper = engine.sweeper().clone();
        let interval = cfg.sweep.interval();
        let mut rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            sweeper
                .run(interval, async move {
                    let _ = rx.changed().await;
                })
                .await;
        }))
    };

    let addr = cfg.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, sweep_interval_secs = cfg.sweep.interval_seconds, "badge engine ready");

    axum::serve(listener, api::router(engine))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = sweeper_task {
        let _ = task.await;
    }
    let _ = outbox_task.await;
    Ok(())
}
