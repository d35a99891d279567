//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Default request/response body ceiling (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: u64 = 1024 * 1024;

/// Prefix selecting the environment variables exposed by `/env`.
pub const ENV_PASSTHROUGH_PREFIX: &str = "HTTPBIN_ENV_";

/// Value served by `/hostname` unless the real hostname is exposed.
pub const DUMMY_HOSTNAME: &str = "httpbin";

/// Default per-request duration ceiling.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(10);

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Per-request resource ceilings.
    pub limits: LimitsConfig,

    /// Path prefix, redirect allow-list and header exclusions.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Host details the server is willing to reveal.
    pub introspection: IntrospectionConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to listen on.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl ListenerConfig {
    /// `host:port` as handed to the socket layer.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Body and duration ceilings applied to every request.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of a request or variable-length response body, in bytes.
    pub max_body_size: u64,

    /// Maximum wall-clock time a request may take, e.g. `"10s"`.
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_duration: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }
}

/// Route mounting and request inspection settings.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Path prefix all routes are mounted under (empty, or `/x` without trailing slash).
    pub prefix: String,

    /// Hosts `/redirect-to` may send clients to. Empty means unrestricted.
    pub allowed_redirect_domains: Vec<String>,

    /// Header name patterns dropped from echoed request headers (`X-Platform-*`).
    pub exclude_headers: Vec<String>,
}

/// What `/env` and `/hostname` expose.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct IntrospectionConfig {
    /// `HTTPBIN_ENV_*` variables, keyed by their full name. Collected by the loader.
    pub env: BTreeMap<String, String>,

    /// Expose the machine hostname instead of a placeholder.
    pub use_real_hostname: bool,

    /// Hostname resolved at load time when `use_real_hostname` is set.
    #[serde(skip)]
    pub real_hostname: Option<String>,
}

impl IntrospectionConfig {
    /// The name `/hostname` reports.
    pub fn hostname(&self) -> &str {
        self.real_hostname.as_deref().unwrap_or(DUMMY_HOSTNAME)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log format (text or json).
    pub log_format: LogFormat,

    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.limits.max_body_size, 1_048_576);
        assert_eq!(config.limits.max_duration, Duration::from_secs(10));
        assert!(config.routing.prefix.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Text);
        assert!(config.introspection.env.is_empty());
        assert_eq!(config.introspection.hostname(), DUMMY_HOSTNAME);
    }

    #[test]
    fn resolved_hostname_is_never_read_from_file() {
        let config: ServerConfig = toml::from_str(
            "[introspection]\nuse_real_hostname = true\nreal_hostname = \"spoofed\"\n",
        )
        .unwrap();
        assert!(config.introspection.use_real_hostname);
        assert_eq!(config.introspection.real_hostname, None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [limits]
            max_duration = "1500ms"

            [routing]
            prefix = "/bin"
            "#,
        )
        .unwrap();

        assert_eq!(config.limits.max_duration, Duration::from_millis(1500));
        assert_eq!(config.limits.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.routing.prefix, "/bin");
        assert_eq!(config.listener.port, 8080);
    }

    #[test]
    fn bad_duration_is_a_parse_error() {
        let result: Result<ServerConfig, _> = toml::from_str("[limits]\nmax_duration = \"soon\"\n");
        assert!(result.is_err());
    }
}
