//! Session results and failures.
//!
//! Every session ends in exactly one [`Outcome`] or one [`SessionError`].
//! Errors stay inside the session that produced them; the listener only
//! logs them.

use std::io;
use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::http::forward::ForwardError;
use crate::http::request::ParseError;
use crate::observability::events;
use crate::relay::dialer::DialError;
use crate::relay::pump::Direction;
use crate::routing::RouteError;

/// How a session completed successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An HTTP request was forwarded and its response written back.
    Forwarded { status: StatusCode, body_bytes: u64 },
    /// An opaque session ended when `first` finished after `bytes`.
    Relayed { first: Direction, bytes: u64 },
}

/// Why a session ended early.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed HTTP request: {0}")]
    Parse(#[from] ParseError),

    #[error("no target for {0}")]
    NoRoute(String),

    #[error("upstream request failed: {0}")]
    Forward(#[from] ForwardError),

    #[error("failed to write response to client: {0}")]
    ClientWrite(#[source] io::Error),

    #[error("failed to create dialer: {0}")]
    Dialer(#[source] DialError),

    #[error("failed to connect to {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: DialError,
    },

    #[error("{direction} failed: {source}")]
    Relay {
        direction: Direction,
        #[source]
        source: io::Error,
    },

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },
}

impl SessionError {
    /// Event name under which this error is logged.
    pub fn event(&self) -> &'static str {
        match self {
            SessionError::Parse(_) => events::HTTP_PARSE_ERROR,
            SessionError::NoRoute(_) => events::ROUTE_MISS,
            SessionError::Forward(_) | SessionError::Dial { .. } => events::UPSTREAM_ERROR,
            SessionError::ClientWrite(_) => events::CLIENT_WRITE_ERROR,
            SessionError::Dialer(_) => events::DIALER_ERROR,
            SessionError::Relay { .. } => events::RELAY_ERROR,
            SessionError::Timeout { .. } => events::SESSION_TIMEOUT,
        }
    }
}

/// Failure to build a runtime snapshot from a configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid route: {0}")]
    Route(#[from] RouteError),

    #[error("invalid upstream proxy: {0}")]
    Forwarder(#[from] ForwardError),
}
