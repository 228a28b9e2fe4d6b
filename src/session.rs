//! Per-connection session driver.
//!
//! # Data Flow
//! ```text
//! Accepted stream
//!     → sniff (initial window, bytes kept)
//!     → Http   → http::handle   ┐
//!     → Opaque → relay::handle  ┴ bounded by the I-O window
//!     → Outcome or SessionError, logged once
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Outcome, SessionError};
use crate::http::request::MAX_HEAD_LEN;
use crate::net::prebuffered::Prebuffered;
use crate::net::sniff::{sniff, Protocol};
use crate::net::stream::ClientStream;
use crate::observability::events;
use crate::state::RelayState;

/// Classify `stream` and serve it to completion.
///
/// Both the client stream and any upstream stream are closed when this
/// returns, whatever the result.
pub async fn handle_connection<S: ClientStream>(
    stream: S,
    state: Arc<RelayState>,
) -> Result<Outcome, SessionError> {
    let timeouts = &state.config.timeouts;
    let mut reader = Prebuffered::new(stream, MAX_HEAD_LEN);

    let protocol = sniff(&mut reader, timeouts.initial()).await;
    info!(
        event = events::PROTOCOL_CLASSIFIED,
        protocol = %protocol,
        buffered = reader.buffer().len(),
        "Protocol classified"
    );

    match protocol {
        Protocol::Http => {
            within(timeouts.io(), "http exchange", crate::http::handle(reader, &state)).await
        }
        Protocol::Opaque => {
            within(timeouts.io(), "opaque relay", crate::relay::handle(reader, &state)).await
        }
    }
}

async fn within<F>(window: Duration, stage: &'static str, fut: F) -> Result<Outcome, SessionError>
where
    F: Future<Output = Result<Outcome, SessionError>>,
{
    timeout(window, fut)
        .await
        .unwrap_or(Err(SessionError::Timeout {
            stage,
            after: window,
        }))
}

/// Serve a session and log how it ended.
pub async fn run<S: ClientStream>(stream: S, state: Arc<RelayState>) {
    info!(event = events::CONNECTION_OPENED, "Connection opened");

    match handle_connection(stream, state).await {
        Ok(Outcome::Forwarded { status, body_bytes }) => info!(
            event = events::SESSION_CLOSED,
            status = status.as_u16(),
            body_bytes,
            "Session closed"
        ),
        Ok(Outcome::Relayed { first, bytes }) => info!(
            event = events::SESSION_CLOSED,
            first = %first,
            bytes,
            "Session closed"
        ),
        Err(e @ SessionError::NoRoute(_)) => warn!(event = e.event(), error = %e, "No target"),
        Err(e @ SessionError::ClientWrite(_)) => {
            debug!(event = e.event(), error = %e, "Client went away")
        }
        Err(e) => warn!(event = e.event(), error = %e, "Session failed"),
    }
}
