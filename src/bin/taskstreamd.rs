//! `taskstreamd` — standalone server binary wiring the service container to
//! an axum listener.
//!
//! CLI overrides follow the same shape as the agent-platform examples'
//! servers: a small `clap`-derived struct layered on top of `Config::from_env`,
//! with tracing initialized via `tracing_subscriber::registry()` before
//! anything else runs.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use taskstream_rs::config::Config;
use taskstream_rs::engine::scripted::ScriptedEngine;
use taskstream_rs::engine::WorkflowEngine;
use taskstream_rs::event_log::{EventLog, InMemoryEventLog};
use taskstream_rs::http;
use taskstream_rs::state::AppState;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Task execution and event-replay server.
#[derive(Parser, Debug)]
#[command(name = "taskstreamd")]
struct Cli {
    /// Override RESEARCH_BIND_ADDR.
    #[arg(long)]
    bind_addr: Option<SocketAddr>,

    /// Override RESEARCH_MAX_CONCURRENT_TASKS.
    #[arg(long)]
    max_concurrent_tasks: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskstream_rs=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(ceiling) = cli.max_concurrent_tasks {
        config.max_concurrent_tasks = ceiling;
    }

    // No external Workflow Engine is wired into this binary; it serves as a
    // runnable demonstration of the substrate against a scripted one.
    let engine: Arc<dyn WorkflowEngine> = Arc::new(ScriptedEngine::new(Vec::new()));
    let event_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());

    let state = AppState::new(
        event_log,
        engine,
        config.max_concurrent_tasks,
        config.tail_block,
        config.task_ttl_days,
    );

    let app = http::router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "taskstreamd listening");

    spawn_retention_sweeper(state, config.event_retention_days.max(config.task_ttl_days));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("taskstreamd shut down gracefully");
    Ok(())
}

/// Periodically sweeps expired tasks so long-running processes don't
/// accumulate terminal records forever between explicit `/worker/cleanup`
/// calls.
fn spawn_retention_sweeper(state: AppState, ttl_days: u64) {
    tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(3600);
        loop {
            tokio::time::sleep(interval).await;
            let swept = state.task_manager.cleanup(ttl_days).await;
            if swept > 0 {
                info!(swept, "retention sweep evicted expired tasks");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).unwrap();
        tokio::select! {
            _ = ctrl_c => info!("received ctrl+c, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received ctrl+c, shutting down");
    }
}
