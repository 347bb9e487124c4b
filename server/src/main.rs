mod config;
mod connections;
mod error;
mod identity;
mod rooms;
mod router;
mod session;
mod transport;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use connections::ConnectionManager;
use identity::GuestResolver;
use rooms::{ColorPolicy, RoomRegistry};
use router::EventRouter;
use session::{SessionConfig, SessionManager};
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Log to stdout, or to a daily rolling file when a log directory is set.
/// The returned guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "chessroom-server");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_span_events(FmtSpan::CLOSE)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_dir = config::get_log_dir();
    let _guard = init_tracing(log_dir.as_deref());

    let config = config::ServerConfig::from_env();
    tracing::info!(
        addr = %config.addr,
        grace_secs = config.grace.as_secs(),
        abort_plies = config.abort_ply_limit,
        retention_secs = config.retention.as_secs(),
        log_dir = ?config.log_dir,
        "Starting chess room server"
    );

    let sessions = Arc::new(SessionManager::new(
        Arc::new(chess::StandardOracle),
        SessionConfig::from(&config),
    ));
    let rooms = Arc::new(RoomRegistry::new(
        Arc::clone(&sessions),
        ColorPolicy::Random,
    ));
    let router = Arc::new(EventRouter::new(
        rooms,
        sessions,
        ConnectionManager::new(),
        config.retention,
    ));

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!("Listening on ws://{}", config.addr);

    tokio::select! {
        result = transport::serve(listener, router, Arc::new(GuestResolver::new())) => {
            result.context("listener stopped")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
