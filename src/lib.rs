//! Loopback relay for the YAMN remailer client.
//!
//! One listening socket serves two kinds of clients. HTTP requests for a
//! small allow-list of `host+path` keys are reissued to their mapped URL;
//! every other connection is treated as a mail-submission session and
//! relayed byte-for-byte to a fixed upstream. All egress goes through a
//! SOCKS5 proxy (Tor by default).

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod relay;
pub mod routing;

// Sessions and shared state
pub mod error;
pub mod session;
pub mod state;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::RelayConfig;
pub use error::{Outcome, SessionError};
pub use lifecycle::Shutdown;
pub use state::{RelayState, SharedState};
