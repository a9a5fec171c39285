// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Edge Forwarder
//!
//! Forwards every request to the configured upstream application so clients
//! never learn its address. No authentication decision is made here.
//!
//! ## Header Rewriting
//!
//! - Hop-by-hop headers (and any named in `Connection`) are dropped both ways
//! - Client-identifying headers (`X-Forwarded-*`, `Forwarded`, `X-Real-IP`,
//!   `CF-Connecting-IP`, `True-Client-IP`, `Host`) are dropped on the way in
//! - Framing headers are dropped on the way in; the buffered body is
//!   re-framed by the client
//! - When a service token is configured, the client id / secret headers are
//!   replaced with it
//!
//! Methods, paths, query strings, statuses and bodies pass through unchanged.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
    Router,
};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::auth::{CLIENT_ID_HEADER, CLIENT_SECRET_HEADER};
use crate::config::{ConfigError, EdgeConfig, SERVICE_TOKEN_ID_ENV, SERVICE_TOKEN_SECRET_ENV};
use crate::error::ApiError;

/// Largest request body buffered for forwarding.
const MAX_REQUEST_BODY: usize = 32 * 1024 * 1024;

/// Upstream connect timeout. Responses may stream for as long as they need.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const CLIENT_IDENTIFYING: [HeaderName; 8] = [
    header::HOST,
    header::FORWARDED,
    HeaderName::from_static("x-forwarded-for"),
    HeaderName::from_static("x-forwarded-host"),
    HeaderName::from_static("x-forwarded-proto"),
    HeaderName::from_static("x-real-ip"),
    HeaderName::from_static("cf-connecting-ip"),
    HeaderName::from_static("true-client-ip"),
];

/// Recomputed from the buffered body.
const FRAMING: [HeaderName; 1] = [header::CONTENT_LENGTH];

/// Forwards requests to a single upstream.
pub struct EdgeForwarder {
    upstream: Url,
    service_token: Option<(HeaderValue, HeaderValue)>,
    client: reqwest::Client,
}

impl EdgeForwarder {
    pub fn new(config: EdgeConfig) -> Result<Self, ConfigError> {
        let service_token = match config.service_token.pair() {
            Some((id, secret)) => Some((
                header_value(SERVICE_TOKEN_ID_ENV, id)?,
                header_value(SERVICE_TOKEN_SECRET_ENV, secret)?,
            )),
            None => None,
        };

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            upstream: config.upstream,
            service_token,
            client,
        })
    }

    pub fn injects_service_token(&self) -> bool {
        self.service_token.is_some()
    }

    /// Upstream URL for an inbound path and query.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.upstream.clone();
        let base = self.upstream.path().trim_end_matches('/');
        url.set_path(&format!("{base}{path}"));
        url.set_query(query);
        url
    }

    /// Outbound request headers for an inbound request.
    pub fn rewrite_request_headers(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut headers = strip_hop_by_hop(inbound);
        for name in CLIENT_IDENTIFYING.iter().chain(FRAMING.iter()) {
            headers.remove(name);
        }

        if let Some((id, secret)) = &self.service_token {
            headers.insert(CLIENT_ID_HEADER, id.clone());
            headers.insert(CLIENT_SECRET_HEADER, secret.clone());
        }

        headers
    }
}

/// Router that forwards every path.
pub fn router(forwarder: EdgeForwarder) -> Router {
    Router::new()
        .fallback(forward)
        .with_state(Arc::new(forwarder))
        .layer(TraceLayer::new_for_http())
}

async fn forward(
    State(forwarder): State<Arc<EdgeForwarder>>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let url = forwarder.target_url(parts.uri.path(), parts.uri.query());
    let headers = forwarder.rewrite_request_headers(&parts.headers);

    let body = axum::body::to_bytes(body, MAX_REQUEST_BODY)
        .await
        .map_err(|e| ApiError::RequestBody(e.to_string()))?;

    tracing::debug!(target: "edge.forward", method = %parts.method, path = %parts.uri.path(), "Forwarding request");

    let upstream = forwarder
        .client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(target: "edge.forward", error = %e, "Upstream request failed");
            ApiError::UpstreamUnavailable
        })?;

    let status = upstream.status();
    let headers = strip_hop_by_hop(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

/// Copy `headers` without hop-by-hop headers, including those listed in
/// `Connection`.
fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();

    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        out.remove(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceTokenConfig;
    use axum::http::{Method, Request as HttpRequest, StatusCode};
    use tower::ServiceExt;
    use wiremock::matchers::{body_string, header as has_header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

    fn forwarder(upstream: &str, token: bool) -> EdgeForwarder {
        let service_token = if token {
            ServiceTokenConfig {
                client_id: Some("edge.access".to_string()),
                client_secret: Some("edge-secret".to_string()),
            }
        } else {
            ServiceTokenConfig::default()
        };
        EdgeForwarder::new(EdgeConfig {
            upstream: Url::parse(upstream).unwrap(),
            service_token,
        })
        .unwrap()
    }

    #[test]
    fn target_url_keeps_path_and_query() {
        let fwd = forwarder("http://10.0.0.5:8080", false);
        assert_eq!(
            fwd.target_url("/api/v1/items", Some("page=2")).as_str(),
            "http://10.0.0.5:8080/api/v1/items?page=2"
        );
    }

    #[test]
    fn target_url_respects_upstream_base_path() {
        let fwd = forwarder("http://app.internal/base/", false);
        assert_eq!(
            fwd.target_url("/x", None).as_str(),
            "http://app.internal/base/x"
        );
    }

    #[test]
    fn client_identifying_headers_are_removed() {
        let fwd = forwarder("http://app.internal", false);
        let mut inbound = HeaderMap::new();
        inbound.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        inbound.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));
        inbound.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.9"));
        inbound.insert(header::HOST, HeaderValue::from_static("public.example.com"));
        inbound.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let out = fwd.rewrite_request_headers(&inbound);
        assert!(out.get("x-forwarded-for").is_none());
        assert!(out.get("x-real-ip").is_none());
        assert!(out.get("cf-connecting-ip").is_none());
        assert!(out.get(header::HOST).is_none());
        assert_eq!(out.get(header::ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn content_length_is_not_forwarded() {
        let fwd = forwarder("http://app.internal", false);
        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONTENT_LENGTH, HeaderValue::from_static("17"));
        inbound.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let out = fwd.rewrite_request_headers(&inbound);
        assert!(out.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(out.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn connection_listed_headers_are_removed() {
        let fwd = forwarder("http://app.internal", false);
        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONNECTION, HeaderValue::from_static("close, x-session-hint"));
        inbound.insert("x-session-hint", HeaderValue::from_static("1"));
        inbound.insert(header::TE, HeaderValue::from_static("trailers"));

        let out = fwd.rewrite_request_headers(&inbound);
        assert!(out.is_empty());
    }

    #[test]
    fn service_token_replaces_client_supplied_pair() {
        let fwd = forwarder("http://app.internal", true);
        assert!(fwd.injects_service_token());

        let mut inbound = HeaderMap::new();
        inbound.insert(CLIENT_ID_HEADER, HeaderValue::from_static("spoofed"));

        let out = fwd.rewrite_request_headers(&inbound);
        assert_eq!(out.get(CLIENT_ID_HEADER).unwrap(), "edge.access");
        assert_eq!(out.get(CLIENT_SECRET_HEADER).unwrap(), "edge-secret");
    }

    #[tokio::test]
    async fn forwards_request_and_response_unchanged() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/items"))
            .and(query_param("dry_run", "true"))
            .and(has_header("cf-access-client-id", "edge.access"))
            .and(body_string("{\"name\":\"widget\"}"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-upstream", "yes")
                    .set_body_string("created"),
            )
            .expect(1)
            .mount(&upstream)
            .await;

        let app = router(forwarder(&upstream.uri(), true));
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/api/items?dry_run=true")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from("{\"name\":\"widget\"}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"created");

        let received: Vec<MockRequest> = upstream.received_requests().await.unwrap();
        assert!(received[0].headers.get("x-forwarded-for").is_none());
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        // Nothing listens on port 1.
        let app = router(forwarder("http://127.0.0.1:1", false));
        let request = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            &body[..],
            br#"{"success":false,"error":"Upstream unavailable"}"#
        );
    }
}
