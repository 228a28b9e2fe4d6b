//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that every route maps to an absolute http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An address field is not `host:port`.
    #[error("{field}: invalid address {value:?}, expected host:port")]
    InvalidAddress { field: &'static str, value: String },

    /// A timeout is zero.
    #[error("timeouts.{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    /// A route key is empty or carries a scheme.
    #[error("route key {0:?} must be a bare host+path")]
    InvalidRouteKey(String),

    /// A route target is not an absolute http(s) URL.
    #[error("route {key:?}: invalid target {target:?}: {reason}")]
    InvalidRouteTarget {
        key: String,
        target: String,
        reason: String,
    },

    /// The companion is enabled without a program.
    #[error("companion.program must not be empty when the companion is enabled")]
    MissingCompanionProgram,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("proxy_address", &config.proxy_address),
        ("smtp_target", &config.smtp_target),
    ] {
        if !is_host_port(value) {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }

    // Port 0 binds an ephemeral port.
    if split_host_port(&config.listen_address).is_none() {
        errors.push(ValidationError::InvalidAddress {
            field: "listen_address",
            value: config.listen_address.clone(),
        });
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("initial_secs", timeouts.initial_secs),
        ("io_secs", timeouts.io_secs),
        ("keepalive_secs", timeouts.keepalive_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout { field });
        }
    }

    for (key, target) in &config.routes {
        if key.is_empty() || key.contains("://") {
            errors.push(ValidationError::InvalidRouteKey(key.clone()));
        }
        if let Err(reason) = check_route_target(target) {
            errors.push(ValidationError::InvalidRouteTarget {
                key: key.clone(),
                target: target.clone(),
                reason,
            });
        }
    }

    if config.companion.enabled && config.companion.program.trim().is_empty() {
        errors.push(ValidationError::MissingCompanionProgram);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts `host:port` and `[v6]:port`, with a non-zero port.
pub(crate) fn is_host_port(value: &str) -> bool {
    split_host_port(value).is_some_and(|(_, port)| port != 0)
}

fn split_host_port(value: &str) -> Option<(&str, u16)> {
    let (host, port) = value.rsplit_once(':')?;
    let host_ok = if let Some(inner) = host.strip_prefix('[') {
        inner.strip_suffix(']').is_some_and(|ip| !ip.is_empty())
    } else {
        !host.is_empty() && !host.contains(':')
    };
    let port = port.parse::<u16>().ok()?;
    host_ok.then_some((host, port))
}

fn check_route_target(target: &str) -> Result<(), String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {other:?}")),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
