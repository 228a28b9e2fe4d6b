//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed HTTP request (host, path)
//!     → route_key() ("dummy.tld/pubring.mix")
//!     → RouteTable::lookup (exact match)
//!     → Return: absolute upstream URL or None
//!
//! Route Compilation (at startup and on reload):
//!     [routes] table
//!     → parse every target as a URL
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per config snapshot, immutable at runtime
//! - Deterministic: same input always matches same route
//! - No default route: unmapped requests are dropped

pub mod router;

pub use router::{route_key, RouteError, RouteTable};
