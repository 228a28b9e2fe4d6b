//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured listen address
//! - Accept incoming TCP connections and spawn one session task each
//! - Survive transient accept errors
//!
//! # Design Decisions
//! - No admission control: every accepted connection gets a task
//! - Each session loads the current state snapshot once, at accept time
//! - Shutdown stops accepting; in-flight sessions are not drained

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::net::connection::SessionId;
use crate::observability::events;
use crate::session;
use crate::state::SharedState;

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// The relay's listening socket.
pub struct Listener {
    inner: TcpListener,
    state: SharedState,
}

impl Listener {
    /// Bind to `addr`. Sessions will be served from `state`.
    pub async fn bind(addr: &str, state: SharedState) -> Result<Self, ListenerError> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        let local_addr = inner.local_addr().map_err(ListenerError::LocalAddr)?;
        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self { inner, state })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Listener shutting down");
                    return;
                }
                accepted = self.inner.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(event = events::ACCEPT_ERROR, error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            let state = self.state.load_full();
            let span = tracing::info_span!("session", id = %SessionId::next(), peer = %peer);
            tokio::spawn(session::run(stream, state).instrument(span));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::lifecycle::Shutdown;
    use crate::state::{shared, RelayState};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn state() -> SharedState {
        shared(RelayState::new(RelayConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let err = Listener::bind(&addr, state()).await.err().unwrap();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn unmapped_request_is_closed_and_loop_stops_on_shutdown() {
        let listener = Listener::bind("127.0.0.1:0", state()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(listener.run(shutdown.subscribe()));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /nothing HTTP/1.1\r\nHost: dummy.tld\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());

        shutdown.trigger();
        handle.await.unwrap();
    }
}
