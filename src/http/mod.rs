//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Connection classified as HTTP
//!     → request.rs (parse one request head, body stays in the stream)
//!     → routing (host+path → upstream URL, miss closes silently)
//!     → body.rs (stream the request body out of the client socket)
//!     → forward.rs (reissue through socks5h, one attempt)
//!     → response.rs (status, headers and body back to the client)
//!     → Close
//! ```
//!
//! # Design Decisions
//! - Exactly one request per connection; no keep-alive, no pipelining
//! - Nothing is written to the client unless the upstream answered
//! - The head parser is hand-driven so a malformed request can be dropped
//!   without generating an error response

pub mod body;
pub mod forward;
pub mod request;
pub mod response;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Outcome, SessionError};
use crate::net::prebuffered::Prebuffered;
use crate::net::stream::ClientStream;
use crate::observability::events;
use crate::state::RelayState;

pub use forward::{ForwardError, HttpForwarder};
pub use request::{BodyKind, ParseError, RequestHead};

/// Serve one HTTP request from `reader` through the route table.
pub async fn handle<S: ClientStream>(
    mut reader: Prebuffered<S>,
    state: &RelayState,
) -> Result<Outcome, SessionError> {
    let head = RequestHead::read(&mut reader).await?;
    let key = head.route_key();
    let Some(target) = state.routes.lookup(&key) else {
        return Err(SessionError::NoRoute(key));
    };
    info!(
        event = events::ROUTE_HIT,
        method = %head.method,
        key = %key,
        target = %target,
        "Route matched"
    );

    let body_kind = head.body_kind()?;
    let method = head.method.clone();

    let (prefix, client) = reader.into_parts();
    let (client_rd, mut client_wr) = tokio::io::split(client);
    let body = body::outbound_body(body_kind, Prebuffered::with_prefix(prefix, client_rd));

    let response = state.forwarder.forward(head, target, body).await?;
    let status = response.status();

    let body_bytes = response::write_response(&mut client_wr, response, &method)
        .await
        .map_err(SessionError::ClientWrite)?;
    if let Err(e) = client_wr.shutdown().await {
        debug!(error = %e, "Client shutdown failed");
    }

    info!(
        event = events::HTTP_FORWARDED,
        status = status.as_u16(),
        body_bytes,
        "Response relayed"
    );
    Ok(Outcome::Forwarded { status, body_bytes })
}
