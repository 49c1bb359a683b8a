// HTTP client for forwarding requests to a downstream proxy unchanged

use async_trait::async_trait;
use axum::http::Method;
use std::time::Duration;
use tracing::debug;

use crate::core::errors::BridgeError;

/// Raw response from the downstream proxy, passed back to the client
/// without re-enveloping.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Forwarder for requests the dispatch filter decided not to execute
/// locally.
#[async_trait]
pub trait ProxyClient: Send + Sync {
    /// Forward the raw request to `url` and return the upstream response.
    /// Failures surface as `UpstreamProxy`, distinct from local command
    /// failures, and are not retried.
    async fn forward(
        &self,
        method: &Method,
        url: &str,
        body: Vec<u8>,
    ) -> Result<ForwardedResponse, BridgeError>;
}

/// reqwest-backed proxy client with connection pooling.
pub struct HttpProxyClient {
    http_client: reqwest::Client,
}

impl HttpProxyClient {
    pub fn new(timeout_secs: u64) -> Result<Self, BridgeError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(2)) // fail fast on connection
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| {
                BridgeError::Configuration(format!("failed to create proxy client: {e}"))
            })?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ProxyClient for HttpProxyClient {
    async fn forward(
        &self,
        method: &Method,
        url: &str,
        body: Vec<u8>,
    ) -> Result<ForwardedResponse, BridgeError> {
        debug!(method = %method, url = %url, "forwarding request upstream");

        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| BridgeError::UpstreamProxy(format!("invalid method: {e}")))?;

        let mut request = self.http_client.request(method, url);
        if !body.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BridgeError::UpstreamProxy(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::UpstreamProxy(e.to_string()))?
            .to_vec();

        Ok(ForwardedResponse { status, body })
    }
}
