//! Best-effort visit logging.
//!
//! The middleware runs after the inner handler and records one append-only
//! `VisitRecord` per request, skipping excluded prefixes (static assets,
//! admin UI). Extraction and sink failures are absorbed with a diagnostic;
//! logging must never fail a request or alter its response.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::debug;

const PATH_CAP: usize = 512;
const METHOD_CAP: usize = 10;
const USER_AGENT_CAP: usize = 1024;
const REFERRER_CAP: usize = 1024;
const LOCATION_CAP: usize = 255;

/// Immutable append-only log entry for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub visited_at: DateTime<Utc>,
    pub path: String,
    pub method: String,
    pub client_ip: Option<IpAddr>,
    pub user_agent: String,
    pub referrer: String,
    pub location: String,
    pub identity: Option<String>,
}

/// Paths under these prefixes are never logged.
#[derive(Debug, Clone)]
pub struct VisitConfig {
    pub excluded_prefixes: Vec<String>,
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec!["/static".to_string(), "/admin".to_string()],
        }
    }
}

/// Sink failure. Absorbed by the middleware, surfaced only as a diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum VisitLogError {
    #[error("visit sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for visit records; storage is the caller's concern.
pub trait VisitSink: Send + Sync {
    fn record(&self, record: VisitRecord) -> Result<(), VisitLogError>;
}

/// Authenticated identity attached to a request by the login flow; picked up
/// from request extensions when present.
#[derive(Debug, Clone)]
pub struct VisitIdentity(pub String);

/// First address of the forwarded-for chain, falling back to the direct
/// connection address. Anything that does not parse as an IP is discarded.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(str::trim);

    match forwarded {
        Some(candidate) if !candidate.is_empty() => candidate.parse().ok(),
        _ => remote.map(|addr| addr.ip()),
    }
}

/// Coarse location from proxy/CDN geo-hint headers; "Unknown" when absent.
pub fn location_hint(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let parts: Vec<String> = [header("x-city"), header("x-region"), header("cf-ipcountry")]
        .into_iter()
        .flatten()
        .collect();

    if parts.is_empty() {
        "Unknown".to_string()
    } else {
        truncate(&parts.join(", "), LOCATION_CAP)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn header_value(headers: &HeaderMap, name: &str, cap: usize) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| truncate(value, cap))
        .unwrap_or_default()
}

/// Middleware state: the sink plus exclusion rules.
#[derive(Clone)]
pub struct VisitLogger {
    sink: Arc<dyn VisitSink>,
    config: Arc<VisitConfig>,
}

impl VisitLogger {
    pub fn new(sink: Arc<dyn VisitSink>, config: VisitConfig) -> Self {
        Self {
            sink,
            config: Arc::new(config),
        }
    }

    fn excluded(&self, path: &str) -> bool {
        self.config
            .excluded_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Build and record one entry. Never returns an error to the caller.
    pub fn capture(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        remote: Option<SocketAddr>,
        identity: Option<String>,
        now: DateTime<Utc>,
    ) {
        if self.excluded(path) {
            return;
        }

        let record = VisitRecord {
            visited_at: now,
            path: truncate(path, PATH_CAP),
            method: truncate(method.as_str(), METHOD_CAP),
            client_ip: client_ip(headers, remote),
            user_agent: header_value(headers, "user-agent", USER_AGENT_CAP),
            referrer: header_value(headers, "referer", REFERRER_CAP),
            location: location_hint(headers),
            identity,
        };

        if let Err(err) = self.sink.record(record) {
            debug!(error = %err, "visit record dropped");
        }
    }
}

/// Axum layer entry point: respond first, then log.
pub async fn visit_middleware(
    State(logger): State<VisitLogger>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let headers = request.headers().clone();
    let remote = request
        .extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let identity = request
        .extensions()
        .get::<VisitIdentity>()
        .map(|identity| identity.0.clone());

    let response = next.run(request).await;

    logger.capture(&method, &path, &headers, remote, identity, Utc::now());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).expect("valid name"),
                HeaderValue::from_str(value).expect("valid value"),
            );
        }
        headers
    }

    #[test]
    fn forwarded_for_wins_over_remote() {
        let headers = headers_with(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        let remote = Some("192.0.2.1:443".parse().expect("valid addr"));
        assert_eq!(
            client_ip(&headers, remote),
            Some("203.0.113.7".parse::<IpAddr>().expect("valid ip"))
        );
    }

    #[test]
    fn garbage_forwarded_for_discards_to_none() {
        let headers = headers_with(&[("x-forwarded-for", "not-an-address")]);
        assert_eq!(client_ip(&headers, None), None);
    }

    #[test]
    fn remote_addr_is_the_fallback() {
        let headers = HeaderMap::new();
        let remote: SocketAddr = "198.51.100.2:8080".parse().expect("valid addr");
        assert_eq!(
            client_ip(&headers, Some(remote)),
            Some("198.51.100.2".parse::<IpAddr>().expect("valid ip"))
        );
    }

    #[test]
    fn location_joins_present_geo_headers() {
        let headers = headers_with(&[("x-city", "Harare"), ("cf-ipcountry", "ZW")]);
        assert_eq!(location_hint(&headers), "Harare, ZW");
    }

    #[test]
    fn location_defaults_to_unknown() {
        assert_eq!(location_hint(&HeaderMap::new()), "Unknown");
    }

    #[test]
    fn excluded_prefixes_match_on_path_start() {
        let logger = VisitLogger::new(Arc::new(NullSink), VisitConfig::default());
        assert!(logger.excluded("/static/foo.css"));
        assert!(logger.excluded("/admin/x"));
        assert!(!logger.excluded("/market/trends/"));
    }

    struct NullSink;

    impl VisitSink for NullSink {
        fn record(&self, _record: VisitRecord) -> Result<(), VisitLogError> {
            Ok(())
        }
    }
}
