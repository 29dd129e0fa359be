//! HTTP liveness probe.
//!
//! One probe is exactly one GET against a service's management ping
//! endpoint, bounded by the configured timeout. Every way a probe can go
//! wrong - connect error, timeout, garbage body, missing uptime - collapses
//! into `ProbeOutcome::Unhealthy`; the state machine treats all failure
//! modes alike, but the reason is kept for logging.

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use svcmon_registry::ServiceRecord;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

/// Path of the liveness endpoint every registered service must expose on
/// its management port.
pub const PING_PATH: &str = "/service/ping";

/// Why a probe was classified unhealthy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("invalid probe URL: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("no response within the ping timeout")]
    Timeout,

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("response has no non-null numeric uptime field")]
    MissingUptime,
}

/// Classification of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The service answered in time with a well-formed ping body.
    Healthy { uptime_secs: u64 },
    /// Anything else. The reason is informational only.
    Unhealthy { reason: ProbeFailure },
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy { .. })
    }

    fn unhealthy(reason: ProbeFailure) -> Self {
        ProbeOutcome::Unhealthy { reason }
    }
}

/// Issues one bounded-timeout liveness request against a service.
///
/// Implementations must never mutate registry state and must never return a
/// hard error: every failure mode degrades to `Unhealthy`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, record: &ServiceRecord, ping_timeout: Duration) -> ProbeOutcome;
}

/// The production probe: hyper client, GET, JSON body with an `uptime` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpHealthProbe;

impl HttpHealthProbe {
    pub fn new() -> Self {
        Self
    }
}

/// Builds the ping URL for a service record.
pub fn ping_url(record: &ServiceRecord) -> String {
    format!(
        "{}://{}:{}{}",
        record.protocol, record.address, record.management_port, PING_PATH
    )
}

/// Classifies a ping response body.
///
/// A healthy body is a JSON object whose `uptime` field is a non-null
/// number. Anything else is a `ProbeFailure`.
pub(crate) fn classify_body(body: &[u8]) -> Result<u64, ProbeFailure> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ProbeFailure::MalformedJson(e.to_string()))?;

    value
        .get("uptime")
        .and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        })
        .ok_or(ProbeFailure::MissingUptime)
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, record: &ServiceRecord, ping_timeout: Duration) -> ProbeOutcome {
        let url = ping_url(record);

        let uri: Uri = match url.parse() {
            Ok(uri) => uri,
            Err(e) => return ProbeOutcome::unhealthy(ProbeFailure::InvalidUrl(e.to_string())),
        };

        let client = Client::builder(TokioExecutor::new()).build_http();

        let request = match Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("User-Agent", "svcmon/1.0")
            .body(Empty::<Bytes>::new())
        {
            Ok(request) => request,
            Err(e) => return ProbeOutcome::unhealthy(ProbeFailure::InvalidUrl(e.to_string())),
        };

        // One deadline covers the whole exchange: a service that answers
        // the request but dribbles the body out cannot stretch a probe past
        // the ping timeout.
        let exchange = async {
            let response = client
                .request(request)
                .await
                .map_err(|e| ProbeFailure::Connect(e.to_string()))?;
            let collected = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ProbeFailure::Body(e.to_string()))?;
            Ok::<Bytes, ProbeFailure>(collected.to_bytes())
        };

        let body = match timeout(ping_timeout, exchange).await {
            Ok(Ok(body)) => body,
            Ok(Err(reason)) => {
                debug!(service = %record.id, url = %url, reason = %reason, "ping failed");
                return ProbeOutcome::unhealthy(reason);
            }
            Err(_) => {
                debug!(service = %record.id, url = %url, "ping timed out");
                return ProbeOutcome::unhealthy(ProbeFailure::Timeout);
            }
        };

        match classify_body(&body) {
            Ok(uptime_secs) => ProbeOutcome::Healthy { uptime_secs },
            Err(reason) => ProbeOutcome::unhealthy(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcmon_common::Protocol;

    fn record(address: &str, port: u16) -> ServiceRecord {
        ServiceRecord::new("svc-1", "storage", address, port, Protocol::Http)
    }

    #[test]
    fn test_ping_url() {
        let record = record("localhost", 8081);
        assert_eq!(ping_url(&record), "http://localhost:8081/service/ping");
    }

    #[test]
    fn test_classify_valid_body() {
        assert_eq!(classify_body(br#"{"uptime": 1234}"#), Ok(1234));
    }

    #[test]
    fn test_classify_float_uptime() {
        assert_eq!(classify_body(br#"{"uptime": 12.7}"#), Ok(12));
    }

    #[test]
    fn test_classify_null_uptime() {
        assert_eq!(
            classify_body(br#"{"uptime": null}"#),
            Err(ProbeFailure::MissingUptime)
        );
    }

    #[test]
    fn test_classify_missing_uptime() {
        assert_eq!(
            classify_body(br#"{"status": "ok"}"#),
            Err(ProbeFailure::MissingUptime)
        );
    }

    #[test]
    fn test_classify_negative_uptime() {
        assert_eq!(
            classify_body(br#"{"uptime": -3.5}"#),
            Err(ProbeFailure::MissingUptime)
        );
        assert_eq!(
            classify_body(br#"{"uptime": -3}"#),
            Err(ProbeFailure::MissingUptime)
        );
    }

    #[test]
    fn test_classify_non_numeric_uptime() {
        assert_eq!(
            classify_body(br#"{"uptime": "a while"}"#),
            Err(ProbeFailure::MissingUptime)
        );
    }

    #[test]
    fn test_classify_malformed_json() {
        assert!(matches!(
            classify_body(b"<html>502</html>"),
            Err(ProbeFailure::MalformedJson(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_invalid_host_is_unhealthy() {
        let probe = HttpHealthProbe::new();
        let record = record("not a hostname", 8081);

        let outcome = probe.probe(&record, Duration::from_secs(1)).await;
        assert!(!outcome.is_healthy());
    }

    #[tokio::test]
    async fn test_probe_timeout_covers_headers_and_body() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpListener;

        // A service that takes most of the timeout to answer, then never
        // finishes the body. The whole exchange shares one deadline, so the
        // probe must give up after roughly one timeout, not two.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_millis(400)).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"upt")
                    .await;
                // Stall without closing; the client is still owed 95 bytes.
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });

        let probe = HttpHealthProbe::new();
        let record = record("127.0.0.1", port);

        let started = std::time::Instant::now();
        let outcome = probe.probe(&record, Duration::from_millis(500)).await;
        let elapsed = started.elapsed();

        assert_eq!(
            outcome,
            ProbeOutcome::Unhealthy {
                reason: ProbeFailure::Timeout
            }
        );
        assert!(
            elapsed < Duration::from_millis(900),
            "probe ran past its deadline: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_probe_connection_refused_is_unhealthy() {
        let probe = HttpHealthProbe::new();
        // Port 1 on loopback: nothing listens there.
        let record = record("127.0.0.1", 1);

        let outcome = probe.probe(&record, Duration::from_secs(1)).await;
        match outcome {
            ProbeOutcome::Unhealthy { reason } => {
                assert!(matches!(
                    reason,
                    ProbeFailure::Connect(_) | ProbeFailure::Timeout
                ));
            }
            ProbeOutcome::Healthy { .. } => panic!("probe against a closed port succeeded"),
        }
    }
}
