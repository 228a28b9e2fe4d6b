//! Opaque relay subsystem.
//!
//! # Data Flow
//! ```text
//! Connection classified as opaque (SMTP client waiting for a greeting)
//!     → dialer.rs (TCP to proxy, SOCKS5 CONNECT smtp_target, keep-alive)
//!     → sniffed bytes replayed to upstream first
//!     → pump.rs (two copy tasks)
//!     → first direction to finish ends the session, both sockets closed
//! ```
//!
//! # Design Decisions
//! - The target never changes per session: everything that is not HTTP is
//!   mail submission
//! - Fail-fast teardown: a half-close on either side ends the whole session
//! - The dial deadline is a property of the dialer, not a runtime check of
//!   its concrete type

pub mod dialer;
pub mod pump;

use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::{Outcome, SessionError};
use crate::net::prebuffered::Prebuffered;
use crate::net::stream::ClientStream;
use crate::observability::events;
use crate::state::RelayState;

pub use dialer::{Dial, DialError, Socks5Dialer};
pub use pump::{Direction, Finished};

/// Relay an opaque session to the configured SMTP upstream.
pub async fn handle<S: ClientStream>(
    reader: Prebuffered<S>,
    state: &RelayState,
) -> Result<Outcome, SessionError> {
    let config = &state.config;
    let dialer = Socks5Dialer::new(
        &config.proxy_address,
        config.timeouts.connect(),
        config.timeouts.keepalive(),
    )
    .map_err(SessionError::Dialer)?;

    let upstream = dial(&dialer, &config.smtp_target).await?;
    relay(reader, upstream, config.timeouts.keepalive()).await
}

/// Dial `target`, bounded by the dialer's deadline when it has one.
pub async fn dial<D: Dial>(dialer: &D, target: &str) -> Result<D::Stream, SessionError> {
    let result = match dialer.connect_deadline() {
        Some(deadline) => timeout(deadline, dialer.dial(target))
            .await
            .unwrap_or(Err(DialError::Timeout(deadline))),
        None => dialer.dial(target).await,
    };

    let upstream = result.map_err(|source| SessionError::Dial {
        target: target.to_string(),
        source,
    })?;
    info!(event = events::UPSTREAM_CONNECTED, target, "Upstream connected");
    Ok(upstream)
}

/// Pump bytes between the client and an established upstream.
///
/// Whatever the client sent before this point (still buffered in `reader`)
/// reaches the upstream first.
pub async fn relay<S, U>(
    reader: Prebuffered<S>,
    upstream: U,
    keepalive: Duration,
) -> Result<Outcome, SessionError>
where
    S: ClientStream,
    U: ClientStream,
{
    let (prefix, client) = reader.into_parts();
    enable_keepalive(&client, keepalive, "client");
    enable_keepalive(&upstream, keepalive, "upstream");

    let (client_rd, client_wr) = tokio::io::split(client);
    let client_rd = Prebuffered::with_prefix(prefix, client_rd);

    let Finished { direction, result } =
        pump::pump((client_rd, client_wr), tokio::io::split(upstream)).await;

    match result {
        Ok(bytes) => Ok(Outcome::Relayed {
            first: direction,
            bytes,
        }),
        Err(source) => Err(SessionError::Relay { direction, source }),
    }
}

fn enable_keepalive<T: ClientStream>(stream: &T, interval: Duration, side: &'static str) {
    if let Err(e) = stream.enable_keepalive(interval) {
        warn!(event = events::KEEPALIVE_ERROR, side, error = %e, "Failed to enable keep-alive");
    }
}
