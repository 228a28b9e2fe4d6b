//! Upstream dialing through the SOCKS5 proxy.

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_socks::tcp::Socks5Stream;

use crate::config::validation::is_host_port;
use crate::net::stream::ClientStream;

#[derive(Debug, Error)]
pub enum DialError {
    #[error("invalid proxy address {0:?}")]
    InvalidProxy(String),

    #[error("failed to reach proxy: {0}")]
    ProxyConnect(#[source] io::Error),

    #[error("SOCKS5 handshake failed: {0}")]
    Socks(#[from] tokio_socks::Error),

    #[error("no connection within {0:?}")]
    Timeout(Duration),
}

/// Opens upstream byte streams.
pub trait Dial: Send + Sync {
    type Stream: ClientStream;

    /// Connect to `target` (`host:port`).
    fn dial(&self, target: &str) -> impl Future<Output = Result<Self::Stream, DialError>> + Send;

    /// Upper bound for a whole dial, if this dialer has one.
    fn connect_deadline(&self) -> Option<Duration> {
        None
    }
}

/// Dials through a SOCKS5 proxy; the proxy resolves target hostnames.
#[derive(Debug, Clone)]
pub struct Socks5Dialer {
    proxy: String,
    connect_timeout: Duration,
    keepalive: Duration,
}

impl Socks5Dialer {
    pub fn new(
        proxy: &str,
        connect_timeout: Duration,
        keepalive: Duration,
    ) -> Result<Self, DialError> {
        if !is_host_port(proxy) {
            return Err(DialError::InvalidProxy(proxy.to_string()));
        }
        Ok(Self {
            proxy: proxy.to_string(),
            connect_timeout,
            keepalive,
        })
    }

    async fn connect_proxy(&self) -> Result<TcpStream, DialError> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(self.proxy.as_str()))
            .await
            .map_err(|_| DialError::Timeout(self.connect_timeout))?
            .map_err(DialError::ProxyConnect)?;

        if let Err(e) = stream.enable_keepalive(self.keepalive) {
            tracing::debug!(error = %e, "Failed to enable keep-alive on proxy connection");
        }
        Ok(stream)
    }
}

impl Dial for Socks5Dialer {
    type Stream = TcpStream;

    async fn dial(&self, target: &str) -> Result<TcpStream, DialError> {
        let proxy = self.connect_proxy().await?;
        let stream = Socks5Stream::connect_with_socket(proxy, target).await?;
        Ok(stream.into_inner())
    }

    fn connect_deadline(&self) -> Option<Duration> {
        Some(self.connect_timeout)
    }
}
