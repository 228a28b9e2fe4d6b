//! Outbound HTTP through the SOCKS5 proxy.
//!
//! # Design Decisions
//! - The transport's only route out is `socks5h://`: hostnames are resolved
//!   by the proxy, never locally, and there is no direct fallback
//! - No idle upstream connections are kept; every request dials afresh
//! - HTTP/1.1 only, matching what the client spoke to us

use http::header::HOST;
use thiserror::Error;
use url::Url;

use crate::http::request::RequestHead;

/// Errors from the outbound transport.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build proxied HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Sends rewritten requests to their mapped upstream URL.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    /// Build a forwarder that dials exclusively through `proxy_address`.
    pub fn new(proxy_address: &str) -> Result<Self, ForwardError> {
        let proxy = reqwest::Proxy::all(format!("socks5h://{proxy_address}"))
            .map_err(ForwardError::Client)?;

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .pool_max_idle_per_host(0)
            .http1_only()
            .build()
            .map_err(ForwardError::Client)?;

        Ok(Self { client })
    }

    /// Reissue `head` against `target`, streaming `body` from the client.
    ///
    /// Method and headers are copied; `Host` comes from `target`.
    pub async fn forward(
        &self,
        head: RequestHead,
        target: &Url,
        body: Option<reqwest::Body>,
    ) -> Result<reqwest::Response, ForwardError> {
        let mut headers = head.headers;
        headers.remove(HOST);

        let mut request = self
            .client
            .request(head.method, target.clone())
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }
}
