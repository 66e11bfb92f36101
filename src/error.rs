//! Error types.
//!
//! [`AppError`] is the per-request error: it wraps [`anyhow::Error`] and turns
//! into a `500` JSON response via [`IntoResponse`], so a handler can return
//! `Result<T, AppError>` and propagate with `?`. A failure here never reaches
//! the listener.
//!
//! [`ServerError`] covers the listener itself (binding, serving). Those are
//! fatal and bubble up to `main`.

use std::{io, net::SocketAddr};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Wraps [`anyhow::Error`] so it can be returned from axum handlers.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "handler error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Convert any `Into<anyhow::Error>` into an [`AppError`].
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

/// Failures of the listener itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The socket could not be bound (port in use, privileged port, bad interface).
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server I/O error: {0}")]
    Serve(#[from] io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
