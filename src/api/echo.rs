//! `GET /` — the echo endpoint.
//!
//! The handler is split in two: [`ProbeRequest`] pulls what we need out of the
//! HTTP request, and [`echo`] is a pure function from that plus the current
//! time to the response body. Nothing here reads ambient or thread-local state.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts, State},
    http::request::Parts,
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    api::{request_id::RequestId, AppState},
    error::AppError,
};

/// The parts of an inbound request the echo endpoint cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Direct TCP peer, when the listener recorded one.
    pub peer: Option<SocketAddr>,
    pub path: String,
    /// Set by the request ID middleware; absent when the handler runs bare.
    pub request_id: Option<RequestId>,
}

impl<S> FromRequestParts<S> for ProbeRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Only the socket peer counts; forwarding headers are never consulted.
        let peer = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr);

        Ok(Self {
            peer,
            path: parts.uri.path().to_owned(),
            request_id: parts.extensions.get::<RequestId>().cloned(),
        })
    }
}

/// Response body for `GET /`.
///
/// ```json
/// { "timestamp": "2024-01-01T00:00:00.000000Z", "ip": "127.0.0.1" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub timestamp: String,
    pub ip: String,
}

/// Build the echo response for `request` as of `now`.
pub fn echo(request: &ProbeRequest, now: DateTime<Utc>) -> EchoResponse {
    EchoResponse {
        timestamp: format_timestamp(now),
        ip: peer_ip(request.peer),
    }
}

/// ISO-8601 with microsecond precision and a literal `Z`.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Textual IP of the peer, or `""` when unknown.
///
/// IPv4-mapped IPv6 addresses (what a dual-stack `::` listener reports for
/// IPv4 clients) are shown as plain IPv4.
pub fn peer_ip(peer: Option<SocketAddr>) -> String {
    peer.map(|addr| addr.ip().to_canonical().to_string())
        .unwrap_or_default()
}

pub async fn echo_handler(
    State(state): State<AppState>,
    request: ProbeRequest,
) -> Result<Json<EchoResponse>, AppError> {
    let now = state.clock.now()?;
    let response = echo(&request, now);
    debug!(
        ip = %response.ip,
        path = %request.path,
        request_id = request.request_id.as_ref().map(RequestId::as_str),
        "echo"
    );
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn at(secs: i64, micros: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, micros * 1_000).unwrap()
    }

    fn request_from(peer: &str) -> ProbeRequest {
        ProbeRequest {
            peer: Some(peer.parse().unwrap()),
            path: "/".into(),
            request_id: None,
        }
    }

    // -----------------------------------------------------------------------
    // Extraction
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn extractor_reads_peer_path_and_request_id() {
        let peer: SocketAddr = "192.0.2.7:51234".parse().unwrap();
        let (mut parts, ()) = axum::http::Request::builder()
            .uri("/?x=1")
            .extension(ConnectInfo(peer))
            .extension(RequestId("req-1".into()))
            .body(())
            .unwrap()
            .into_parts();

        let request = ProbeRequest::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(
            request,
            ProbeRequest {
                peer: Some(peer),
                path: "/".into(),
                request_id: Some(RequestId("req-1".into())),
            }
        );
    }

    #[tokio::test]
    async fn extractor_tolerates_missing_extensions() {
        let (mut parts, ()) = axum::http::Request::builder()
            .uri("/")
            .body(())
            .unwrap()
            .into_parts();

        let request = ProbeRequest::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(request.peer, None);
        assert_eq!(request.request_id, None);
    }

    // -----------------------------------------------------------------------
    // Timestamp formatting
    // -----------------------------------------------------------------------

    #[test]
    fn timestamp_has_six_fraction_digits_and_z_suffix() {
        assert_eq!(format_timestamp(at(1_704_067_200, 0)), "2024-01-01T00:00:00.000000Z");
        assert_eq!(format_timestamp(at(1_704_067_200, 123_456)), "2024-01-01T00:00:00.123456Z");
    }

    #[test]
    fn sub_microsecond_precision_is_truncated() {
        let now = Utc.timestamp_opt(1_704_067_200, 999_999_999).unwrap();
        assert_eq!(format_timestamp(now), "2024-01-01T00:00:00.999999Z");
    }

    #[test]
    fn timestamp_round_trips_through_rfc3339_parser() {
        let now = at(1_718_000_000, 42);
        let parsed = DateTime::parse_from_rfc3339(&format_timestamp(now)).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), now);
    }

    // -----------------------------------------------------------------------
    // Peer address
    // -----------------------------------------------------------------------

    #[test]
    fn peer_ip_drops_port() {
        assert_eq!(peer_ip(Some("192.0.2.7:51234".parse().unwrap())), "192.0.2.7");
    }

    #[test]
    fn peer_ip_keeps_ipv6() {
        assert_eq!(peer_ip(Some("[2001:db8::1]:443".parse().unwrap())), "2001:db8::1");
    }

    #[test]
    fn peer_ip_unmaps_ipv4_mapped_ipv6() {
        assert_eq!(peer_ip(Some("[::ffff:127.0.0.1]:9000".parse().unwrap())), "127.0.0.1");
    }

    #[test]
    fn peer_ip_is_empty_when_unknown() {
        assert_eq!(peer_ip(None), "");
    }

    // -----------------------------------------------------------------------
    // echo
    // -----------------------------------------------------------------------

    #[test]
    fn echo_combines_time_and_peer() {
        let resp = echo(&request_from("10.0.0.5:1000"), at(0, 0));
        assert_eq!(
            resp,
            EchoResponse {
                timestamp: "1970-01-01T00:00:00.000000Z".into(),
                ip: "10.0.0.5".into(),
            }
        );
    }

    #[test]
    fn serialized_body_has_exactly_timestamp_and_ip() {
        let resp = echo(&request_from("10.0.0.5:1000"), at(0, 0));
        let value = serde_json::to_value(&resp).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"timestamp") && keys.contains(&"ip"), "{keys:?}");
    }
}
