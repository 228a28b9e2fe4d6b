//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Build state snapshot → Bind listener → Accept
//!
//! Companion (companion.rs):
//!     Locate program → Launch with HTTP_PROXY → Wait → Exit with its code
//!
//! Standalone (signals.rs):
//!     SIGINT/SIGTERM → shutdown.rs → Stop accepting → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then state, then listener
//! - The relay never outlives its companion
//! - No connection draining: in-flight sessions end with the process

pub mod companion;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use companion::{Companion, CompanionError};
pub use shutdown::Shutdown;
pub use startup::{start, Running, StartupError};
