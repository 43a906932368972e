//! HTTP client abstraction for testability.

use bytes::Bytes;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// HTTP status code for a partial-content response to a ranged GET.
pub const PARTIAL_CONTENT: u16 = 206;

/// Network-related errors.
#[derive(Debug, Clone, Error)]
pub enum NetError {
    /// The request could not be sent or timed out.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The origin answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// A successful response to a ranged GET.
///
/// The status is kept alongside the body so callers can detect origins that
/// ignore the `Range` header and answer `200 OK` with the full body.
#[derive(Debug, Clone)]
pub struct RangeResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RangeResponse {
    /// Whether the origin honored the range request.
    pub fn is_partial_content(&self) -> bool {
        self.status == PARTIAL_CONTENT
    }
}

/// Trait for asynchronous HTTP operations.
///
/// This abstraction allows dependency injection and deterministic tests via
/// mock clients. Implementations use non-blocking I/O.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request, returning the full response body.
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes, NetError>> + Send;

    /// Performs an HTTP GET with a `Range: bytes=<start>-<end>` header.
    ///
    /// `end` is inclusive; `None` requests everything from `start` to the
    /// end of the resource. Any success status is returned as a
    /// [`RangeResponse`]; non-success statuses and transport failures are
    /// errors.
    fn get_range(
        &self,
        url: &str,
        start: u64,
        end: Option<u64>,
    ) -> impl Future<Output = Result<RangeResponse, NetError>> + Send;
}

/// Format the `Range` header value for a byte span.
fn range_header(start: u64, end: Option<u64>) -> String {
    match end {
        Some(end) => format!("bytes={start}-{end}"),
        None => format!("bytes={start}-"),
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

const USER_AGENT: &str = concat!("reelcache/", env!("CARGO_PKG_VERSION"));

impl ReqwestClient {
    /// Creates a new client with default configuration.
    ///
    /// Tuned for video payload fetches: connection pooling with keepalive,
    /// and a generous timeout for multi-megabyte bodies.
    pub fn new() -> Result<Self, NetError> {
        Self::with_timeout(60)
    }

    /// Creates a new client with a custom request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, NetError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| NetError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Bytes, NetError> {
        trace!(url, "HTTP GET starting");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NetError::Request(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "HTTP error status");
            return Err(NetError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NetError::Body(e.to_string()))?;
        trace!(url, bytes = body.len(), "HTTP response body read");
        Ok(body)
    }

    async fn get_range(
        &self,
        url: &str,
        start: u64,
        end: Option<u64>,
    ) -> Result<RangeResponse, NetError> {
        let range = range_header(start, end);
        trace!(url, range = %range, "HTTP ranged GET starting");

        let response = self
            .client
            .get(url)
            .header("Range", &range)
            .send()
            .await
            .map_err(|e| NetError::Request(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "HTTP error status for ranged GET");
            return Err(NetError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NetError::Body(e.to_string()))?;

        debug!(
            url,
            status = status.as_u16(),
            bytes = body.len(),
            "HTTP ranged GET finished"
        );

        Ok(RangeResponse {
            status: status.as_u16(),
            body,
        })
    }
}
