//! Listener lifecycle: bind, serve, shut down.
//!
//! [`start`] is the only way to bring the service up. It binds synchronously
//! (so a bad port is reported before anything else happens), then hands the
//! listener to `axum::serve` on a background task and returns a
//! [`ServerHandle`]. The service stays up until the handle is told to shut
//! down; in-flight requests are allowed to finish.

use std::{future::Future, net::SocketAddr, time::Duration};

use anyhow::Context;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::info;

use crate::{
    api::{self, AppState},
    config::ServerConfig,
    error::ServerError,
};

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// The address actually bound; differs from the configured one when port 0 was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections, drain in-flight requests, and wait for the serve task.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        // A dropped receiver means the serve loop already exited; the join reports why.
        let _ = self.shutdown_tx.send(());
        Self::join(self.task).await
    }

    /// Serve until `signal` resolves, then shut down gracefully.
    ///
    /// Returns early with an error if the serve task dies first.
    pub async fn serve_until(mut self, signal: impl Future<Output = ()>) -> Result<(), ServerError> {
        let exited = tokio::select! {
            result = &mut self.task => Some(result),
            () = signal => None,
        };

        match exited {
            Some(result) => {
                result??;
                Ok(())
            }
            None => {
                info!("shutdown signal received");
                self.shutdown().await
            }
        }
    }

    async fn join(task: JoinHandle<std::io::Result<()>>) -> Result<(), ServerError> {
        task.await??;
        Ok(())
    }
}

/// `GET /` on `addr`, bounded by `timeout`. `Ok(true)` means a 2xx answer.
pub async fn check_liveness(addr: SocketAddr, timeout: Duration) -> anyhow::Result<bool> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let resp = client
        .get(format!("http://{addr}/"))
        .send()
        .await
        .with_context(|| format!("no answer from {addr}"))?;
    Ok(resp.status().is_success())
}

/// Bind and serve with the production [`AppState`].
pub async fn start(config: &ServerConfig) -> Result<ServerHandle, ServerError> {
    start_with_state(config, AppState::default()).await
}

/// Bind and serve with an injected [`AppState`].
pub async fn start_with_state(
    config: &ServerConfig,
    state: AppState,
) -> Result<ServerHandle, ServerError> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;

    info!(%local_addr, "listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = api::router(state);

    let task = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
    });

    Ok(ServerHandle {
        local_addr,
        shutdown_tx,
        task,
    })
}
