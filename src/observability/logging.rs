//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick the log level from `RUST_LOG`, falling back to configuration
//! - Switch between human-readable and JSON output
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - JSON format for machine collection, text format for terminals

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Filter directive used when neither `RUST_LOG` nor the configuration
/// yields a usable one.
const FALLBACK_FILTER: &str = "yamn_proxy=info";

/// Build the level filter: `RUST_LOG` wins, then `config.log_level`.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    build_filter(from_env.as_deref(), &config.log_level)
}

fn build_filter(from_env: Option<&str>, configured: &str) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber.
///
/// `format` overrides the configured output format (used by the CLI).
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_logging(config: &ObservabilityConfig, format: Option<LogFormat>) {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = match format.unwrap_or(config.log_format) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_without_env() {
        assert_eq!(build_filter(None, "debug").to_string(), "debug");
    }

    #[test]
    fn env_directives_win() {
        assert_eq!(build_filter(Some("warn"), "debug").to_string(), "warn");
    }

    #[test]
    fn invalid_directives_fall_through() {
        assert_eq!(
            build_filter(Some("yamn_proxy=loud"), "debug").to_string(),
            "debug"
        );
        assert_eq!(
            build_filter(None, "yamn_proxy=loud").to_string(),
            FALLBACK_FILTER
        );
    }

    #[test]
    fn repeated_init_does_not_panic() {
        let config = ObservabilityConfig::default();
        init_logging(&config, None);
        init_logging(&config, Some(LogFormat::Json));
    }
}
