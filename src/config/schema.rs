//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// SOCKS5 proxy used for all egress (e.g., "127.0.0.1:9050").
    pub proxy_address: String,

    /// Local address the relay listens on.
    pub listen_address: String,

    /// Fixed upstream for every non-HTTP session.
    pub smtp_target: String,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// HTTP route table, `host+path` to absolute URL.
    ///
    /// A `[routes]` table in the config file replaces the defaults wholesale.
    pub routes: HashMap<String, String>,

    /// Companion process settings.
    pub companion: CompanionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            proxy_address: "127.0.0.1:9050".to_string(),
            listen_address: "127.0.0.1:4711".to_string(),
            smtp_target: "mailrelay.sec3.net:2525".to_string(),
            timeouts: TimeoutConfig::default(),
            routes: default_routes(),
            companion: CompanionConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_routes() -> HashMap<String, String> {
    HashMap::from([
        (
            "dummy.tld/pubring.mix".to_string(),
            "https://www.harmsk.com/yamn/pubring.mix".to_string(),
        ),
        (
            "dummy.tld/mlist2.txt".to_string(),
            "https://www.harmsk.com/yamn/mlist2.txt".to_string(),
        ),
    ])
}

/// Timeout configuration for the three session windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment through the proxy, in seconds.
    pub connect_secs: u64,

    /// Wait for a new client's first bytes, in seconds.
    pub initial_secs: u64,

    /// Steady-state window covering a whole HTTP exchange or opaque relay.
    pub io_secs: u64,

    /// TCP keep-alive probe interval, in seconds.
    pub keepalive_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn initial(&self) -> Duration {
        Duration::from_secs(self.initial_secs)
    }

    pub fn io(&self) -> Duration {
        Duration::from_secs(self.io_secs)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 60,
            initial_secs: 10,
            io_secs: 300,
            keepalive_secs: 30,
        }
    }
}

/// Companion process configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Launch the companion at startup.
    pub enabled: bool,

    /// Program name or path. Bare names are resolved next to the relay executable.
    pub program: String,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "yamn".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}
