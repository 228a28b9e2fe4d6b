//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration, falling back to the built-in defaults when the file
/// does not exist. Any other failure is an error.
pub fn load_or_default(path: &Path) -> Result<RelayConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            Ok(RelayConfig::default())
        }
        other => other,
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let config: RelayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("yamn-proxy-{}-{}", std::process::id(), name))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_path("does-not-exist.toml");
        let config = load_or_default(&path).unwrap();
        assert_eq!(config.listen_address, "127.0.0.1:4711");
    }

    #[test]
    fn loads_overrides_from_file() {
        let path = temp_path("overrides.toml");
        fs::write(
            &path,
            r#"
            listen_address = "127.0.0.1:4800"
            smtp_target = "smtp.example.org:587"
            "#,
        )
        .unwrap();

        let config = load_or_default(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.listen_address, "127.0.0.1:4800");
        assert_eq!(config.smtp_target, "smtp.example.org:587");
        assert_eq!(config.proxy_address, "127.0.0.1:9050");
    }

    #[test]
    fn syntax_error_is_parse_error() {
        let err = parse_config("listen_address = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = parse_config("[timeouts]\nconnect_secs = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(
                    errors,
                    vec![ValidationError::ZeroTimeout {
                        field: "connect_secs"
                    }]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
