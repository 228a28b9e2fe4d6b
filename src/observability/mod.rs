//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every session runs inside a `session` span (id, peer):
//!     → events.rs (stable `event` field values)
//!     → logging.rs (subscriber: EnvFilter + fmt, text or JSON)
//!     → stdout/stderr
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of formatted messages
//! - One record per session outcome; failures are logged where the session
//!   ends, not where they occur

pub mod events;
pub mod logging;

pub use logging::init_logging;
