//! Gateway configuration with validation.
//!
//! Sources are layered: defaults, then an optional TOML file, then
//! environment variables. CLI flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Port declared by the container image and bound by default
pub const DEFAULT_PORT: u16 = 8080;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener configuration
    pub http: HttpConfig,
    /// API key configuration
    pub auth: AuthConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Trusted `Host` header configuration
    pub hosts: TrustedHostConfig,
    /// External extractor configuration
    pub extractor: ExtractorConfig,
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
}

impl GatewayConfig {
    /// Load configuration from an optional TOML file, then apply the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// | Variable | Effect |
    /// |----------|--------|
    /// | `ALLOW_API_KEYS` | comma-separated accepted API keys |
    /// | `ALLOWED_HOSTS` | comma-separated trusted hosts |
    /// | `YT_DLP_PATH` | extractor executable |
    /// | `LINK_GATEWAY_EXTRACT_TIMEOUT` | extractor timeout (`60s`, `500ms`, `2m`) |
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(keys) = lookup("ALLOW_API_KEYS") {
            self.auth.api_keys = split_list(&keys);
        }
        if let Some(hosts) = lookup("ALLOWED_HOSTS") {
            self.hosts.allowed_hosts = split_list(&hosts);
        }
        if let Some(binary) = lookup("YT_DLP_PATH") {
            if !binary.trim().is_empty() {
                self.extractor.binary = PathBuf::from(binary.trim());
            }
        }
        if let Some(timeout) = lookup("LINK_GATEWAY_EXTRACT_TIMEOUT") {
            match humantime_serde::parse_duration(&timeout) {
                Ok(d) => self.extractor.timeout = d,
                Err(e) => tracing::warn!(value = %timeout, error = %e, "Ignoring invalid LINK_GATEWAY_EXTRACT_TIMEOUT"),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extractor.binary.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "extractor.binary cannot be empty".into(),
            ));
        }

        if self.extractor.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "extractor timeout cannot be 0".into(),
            ));
        }

        if self.timeouts.request.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }

        if self.extractor.timeout >= self.timeouts.request {
            return Err(ConfigError::InvalidTimeout(format!(
                "extractor timeout ({}ms) must be below request timeout ({}ms)",
                self.extractor.timeout.as_millis(),
                self.timeouts.request.as_millis()
            )));
        }

        if self.hosts.allowed_hosts.is_empty() {
            return Err(ConfigError::Invalid(
                "hosts.allowed_hosts cannot be empty".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Accepted keys for the `api_key` query parameter. Empty rejects all.
    pub api_keys: Vec<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods ("*" for all)
    pub allowed_methods: Vec<String>,
    /// Allowed headers ("*" for all)
    pub allowed_headers: Vec<String>,
    /// Allow credentials
    pub allow_credentials: bool,
    /// Max age for preflight cache, in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["*".to_string()],
            allowed_headers: vec!["*".to_string()],
            allow_credentials: true,
            max_age: 600,
        }
    }
}

/// Trusted host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustedHostConfig {
    /// Accepted `Host` values; `*` matches all, `*.example.com` matches subdomains
    pub allowed_hosts: Vec<String>,
}

impl Default for TrustedHostConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: vec!["*".to_string()],
        }
    }
}

/// External extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Executable name or path
    pub binary: PathBuf,
    /// Per-extraction timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline
    #[serde(with = "humantime_serde")]
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(90),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema
    #[error("cannot parse configuration: {0}")]
    Parse(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            let mins = mins.trim().parse::<u64>().map_err(|_| "invalid minutes")?;
            mins.checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("duration overflow")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http_addr().to_string(), "0.0.0.0:8080");
        assert!(config.auth.api_keys.is_empty());
        assert_eq!(config.hosts.allowed_hosts, vec!["*"]);
        assert_eq!(config.extractor.binary, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn test_api_keys_from_env() {
        let mut config = GatewayConfig::default();
        config.apply_env_from(env(&[("ALLOW_API_KEYS", "alpha, beta,,gamma ")]));
        assert_eq!(config.auth.api_keys, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_empty_api_keys_env_yields_no_keys() {
        let mut config = GatewayConfig::default();
        config.auth.api_keys = vec!["stale".into()];
        config.apply_env_from(env(&[("ALLOW_API_KEYS", "")]));
        assert!(config.auth.api_keys.is_empty());
    }

    #[test]
    fn test_extractor_overrides_from_env() {
        let mut config = GatewayConfig::default();
        config.apply_env_from(env(&[
            ("YT_DLP_PATH", "/opt/bin/yt-dlp"),
            ("LINK_GATEWAY_EXTRACT_TIMEOUT", "1500ms"),
            ("ALLOWED_HOSTS", "api.example.com,*.example.org"),
        ]));
        assert_eq!(config.extractor.binary, PathBuf::from("/opt/bin/yt-dlp"));
        assert_eq!(config.extractor.timeout, Duration::from_millis(1500));
        assert_eq!(
            config.hosts.allowed_hosts,
            vec!["api.example.com", "*.example.org"]
        );
    }

    #[test]
    fn test_invalid_timeout_env_is_ignored() {
        let mut config = GatewayConfig::default();
        config.apply_env_from(env(&[("LINK_GATEWAY_EXTRACT_TIMEOUT", "soon")]));
        assert_eq!(config.extractor.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = GatewayConfig::from_toml(
            r#"
            [http]
            port = 9090

            [auth]
            api_keys = ["k1"]

            [extractor]
            timeout = "2m"

            [timeouts]
            request = "3m"
            "#,
        )
        .unwrap();
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.http.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.auth.api_keys, vec!["k1"]);
        assert_eq!(config.extractor.timeout, Duration::from_secs(120));
        assert!(config.cors.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_rejects_bad_duration() {
        let err = GatewayConfig::from_toml("[timeouts]\nrequest = \"forever\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let err = GatewayConfig::from_file(Path::new("/nonexistent/link-gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_extractor_timeout_must_be_below_request_timeout() {
        let mut config = GatewayConfig::default();
        config.extractor.timeout = config.timeouts.request;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = GatewayConfig::default();
        config.extractor.timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_empty_host_list_rejected() {
        let mut config = GatewayConfig::default();
        config.hosts.allowed_hosts.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duration_formats() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("15"), Ok(Duration::from_secs(15)));
        assert!(parse_duration("abc").is_err());
    }

    #[test]
    fn test_minute_overflow_rejected() {
        use humantime_serde::parse_duration;
        assert_eq!(
            parse_duration("999999999999999999m"),
            Err("duration overflow")
        );

        let mut config = GatewayConfig::default();
        config.apply_env_from(env(&[(
            "LINK_GATEWAY_EXTRACT_TIMEOUT",
            "999999999999999999m",
        )]));
        assert_eq!(config.extractor.timeout, Duration::from_secs(60));

        let err = GatewayConfig::from_toml("[extractor]\ntimeout = \"999999999999999999m\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
