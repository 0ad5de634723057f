//! Logging setup.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LINK_GATEWAY_LOG_LEVEL` or `RUST_LOG` | `info` | Log filter directive |
//! | `LINK_GATEWAY_JSON_LOGS` | `true` in containers | JSON formatted output |

use crate::domain::error::GatewayError;
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directive (e.g. `info`, `link_gateway=debug,tower_http=warn`)
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            log_level: lookup("LINK_GATEWAY_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            json_logs: lookup("LINK_GATEWAY_JSON_LOGS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(is_container),
        }
    }
}

/// Install the global tracing subscriber
pub fn init_logging(config: &TelemetryConfig) -> Result<(), GatewayError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| GatewayError::Telemetry(format!("invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| GatewayError::Telemetry(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::from_lookup(lookup(&[]));
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_container_defaults_to_json() {
        let config = TelemetryConfig::from_lookup(lookup(&[("DOCKER_CONTAINER", "1")]));
        assert!(config.json_logs);

        let config = TelemetryConfig::from_lookup(lookup(&[
            ("DOCKER_CONTAINER", "1"),
            ("LINK_GATEWAY_JSON_LOGS", "false"),
        ]));
        assert!(!config.json_logs);
    }

    #[test]
    fn test_level_precedence() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RUST_LOG", "warn"),
            ("LINK_GATEWAY_LOG_LEVEL", "debug"),
        ]));
        assert_eq!(config.log_level, "debug");

        let config = TelemetryConfig::from_lookup(lookup(&[("RUST_LOG", "warn")]));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_filter() {
        let config = TelemetryConfig {
            log_level: "link_gateway=notalevel".to_string(),
            json_logs: false,
        };
        assert!(matches!(
            init_logging(&config),
            Err(GatewayError::Telemetry(_))
        ));
    }
}
