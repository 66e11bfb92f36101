//! Request ID middleware.
//!
//! Every response carries an `X-Request-ID`. A caller-supplied value is kept
//! only when it is short and printable; anything else is replaced with a
//! fresh UUID v4 so a client cannot inject control bytes or unbounded text
//! into our logs. The chosen ID rides along as a [`RequestId`] extension,
//! which [`crate::api::echo::ProbeRequest`] picks up for its log event.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument as _;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied ID we are willing to echo.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// The ID assigned to the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse the caller's ID when acceptable, otherwise mint a new one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let supplied = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| is_acceptable(v));

        match supplied {
            Some(id) => Self(id.to_owned()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_acceptable(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN && id.bytes().all(|b| b.is_ascii_graphic())
}

/// Axum middleware that assigns a [`RequestId`] to every request.
///
/// Apply it inside `tower_http::TraceLayer` so it runs within the trace span.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_headers(req.headers());
    let span = tracing::debug_span!("request_id", id = %id.as_str());
    let header_value = HeaderValue::from_str(id.as_str()).ok();

    req.extensions_mut().insert(id);
    let mut response = next.run(req).instrument(span).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
