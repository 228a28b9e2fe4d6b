//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, one task per connection)
//!     → connection.rs (session id)
//!     → prebuffered.rs (read-ahead that keeps inspected bytes)
//!     → sniff.rs (HTTP or opaque, within the classification window)
//!     → Hand off to the HTTP router or the opaque relay
//! ```
//!
//! # Design Decisions
//! - Inspected bytes are never lost: whichever path runs next reads them
//! - Transport options (keep-alive) are capabilities of the stream type
//! - Accept errors are transient; only bind failures are fatal

pub mod connection;
pub mod listener;
pub mod prebuffered;
pub mod sniff;
pub mod stream;

pub use listener::{Listener, ListenerError};
pub use sniff::Protocol;
pub use stream::ClientStream;
