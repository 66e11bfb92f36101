use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;

mod api;
mod clock;
mod config;
mod error;
mod server;

pub use config::Config;

const HEALTHCHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // When invoked as a Docker HEALTHCHECK, hit `/` and exit immediately.
    // This avoids needing any external tool (curl/wget) in the container image.
    if std::env::args().nth(1).as_deref() == Some("--healthcheck") {
        return healthcheck(&config).await;
    }

    let default_filter = config
        .server
        .log_level
        .clone()
        .unwrap_or_else(|| "clock_echo=info,tower_http=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!(
        bind_addr = %config.server.bind_addr,
        port = config.server.port,
        "clock-echo starting"
    );

    let handle = server::start(&config.server)
        .await
        .context("clock-echo failed to start")?;

    handle
        .serve_until(shutdown_signal())
        .await
        .context("server error")?;

    info!("clock-echo stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Lightweight healthcheck: GET / and exit 0 on 2xx, 1 otherwise.
/// Invoked via `clock-echo --healthcheck` from Docker HEALTHCHECK.
async fn healthcheck(config: &Config) -> anyhow::Result<()> {
    let alive = server::check_liveness(config.server.probe_addr(), HEALTHCHECK_TIMEOUT).await?;
    std::process::exit(if alive { 0 } else { 1 });
}
