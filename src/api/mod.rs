//! HTTP surface: one route, `GET /`.
//!
//! Routing convention:
//! - `GET /` (and `HEAD /`) → 200 echo document
//! - any other method on `/` → 405 with `Allow`
//! - any other path → 404, empty body

use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::clock::{Clock, SystemClock};

pub mod echo;
pub mod request_id;

/// Immutable state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

/// Build the full application router, middleware included.
///
/// Layer order, outermost first: trace → request ID → panic catcher → routes.
/// A panicking handler therefore still produces a 500 carrying its request ID.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(echo::echo_handler))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
