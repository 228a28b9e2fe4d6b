//! Event names carried in the `event` field of session log records.
//!
//! Keeping them in one place lets log queries and tests rely on stable
//! strings.

pub const CONNECTION_OPENED: &str = "connection_opened";
pub const PROTOCOL_CLASSIFIED: &str = "protocol_classified";
pub const ROUTE_HIT: &str = "route_hit";
pub const ROUTE_MISS: &str = "route_miss";
pub const HTTP_FORWARDED: &str = "http_forwarded";
pub const HTTP_PARSE_ERROR: &str = "http_parse_error";
pub const CLIENT_WRITE_ERROR: &str = "client_write_error";
pub const UPSTREAM_CONNECTED: &str = "upstream_connected";
pub const UPSTREAM_ERROR: &str = "upstream_error";
pub const DIALER_ERROR: &str = "dialer_error";
pub const KEEPALIVE_ERROR: &str = "keepalive_error";
pub const RELAY_ERROR: &str = "relay_error";
pub const SESSION_TIMEOUT: &str = "session_timeout";
pub const SESSION_CLOSED: &str = "session_closed";
pub const ACCEPT_ERROR: &str = "accept_error";
pub const CONFIG_RELOADED: &str = "config_reloaded";
