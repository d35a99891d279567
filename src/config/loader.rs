//! Configuration loading from flags, environment and disk.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::config::schema::{LogFormat, ServerConfig, TlsConfig, ENV_PASSTHROUGH_PREFIX};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("https cert and key must both be provided")]
    IncompleteTls,

    #[error("could not look up real hostname: {0}")]
    Hostname(#[source] io::Error),

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

/// Command-line flags. Each flag falls back to the environment variable of the same
/// name; anything left unset keeps the value from the config file or the default.
#[derive(Debug, Default, Parser)]
#[command(name = "httpbin")]
#[command(about = "HTTP request & response test server", long_about = None)]
pub struct CliArgs {
    /// Optional TOML configuration file
    #[arg(long, env = "HTTPBIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host to listen on
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Path prefix (empty or start with slash and does not end with slash)
    #[arg(long, env = "PREFIX")]
    pub prefix: Option<String>,

    /// Maximum size of request or response, in bytes
    #[arg(long, env = "MAX_BODY_SIZE")]
    pub max_body_size: Option<u64>,

    /// Maximum duration a response may take
    #[arg(long, env = "MAX_DURATION", value_parser = humantime::parse_duration)]
    pub max_duration: Option<Duration>,

    /// Comma-separated list of domains the /redirect-to endpoint will allow
    #[arg(long, env = "ALLOWED_REDIRECT_DOMAINS")]
    pub allowed_redirect_domains: Option<String>,

    /// Comma-separated list of header names to drop, supporting wildcard matching
    #[arg(long, env = "EXCLUDE_HEADERS")]
    pub exclude_headers: Option<String>,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// HTTPS server certificate file
    #[arg(long, env = "HTTPS_CERT_FILE")]
    pub https_cert_file: Option<String>,

    /// HTTPS server private key file
    #[arg(long, env = "HTTPS_KEY_FILE")]
    pub https_key_file: Option<String>,

    /// Expose the machine hostname on /hostname instead of a placeholder
    /// (env USE_REAL_HOSTNAME=1 or true)
    #[arg(long)]
    pub use_real_hostname: bool,
}

impl CliArgs {
    /// Overlay every flag that was given onto `config`.
    fn apply(&self, config: &mut ServerConfig) -> Result<(), ConfigError> {
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(prefix) = &self.prefix {
            config.routing.prefix = prefix.clone();
        }
        if let Some(size) = self.max_body_size {
            config.limits.max_body_size = size;
        }
        if let Some(duration) = self.max_duration {
            config.limits.max_duration = duration;
        }
        if let Some(domains) = &self.allowed_redirect_domains {
            config.routing.allowed_redirect_domains = split_list(domains);
        }
        if let Some(headers) = &self.exclude_headers {
            config.routing.exclude_headers = split_list(headers);
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if self.use_real_hostname {
            config.introspection.use_real_hostname = true;
        }

        match (&self.https_cert_file, &self.https_key_file) {
            (Some(cert), Some(key)) => {
                config.listener.tls = Some(TlsConfig {
                    cert_path: cert.clone(),
                    key_path: key.clone(),
                });
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteTls),
        }

        Ok(())
    }
}

/// Split a comma-separated list, trimming entries and dropping empties and duplicates.
pub fn split_list(raw: &str) -> Vec<String> {
    normalize_list(raw.split(','))
}

fn normalize_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.as_ref().trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Load and validate configuration from a TOML file.
pub fn load_file(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServerConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Merge defaults, the optional config file, the flags and the process environment,
/// then validate.
pub fn load_config(args: &CliArgs) -> Result<ServerConfig, ConfigError> {
    let vars = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
    load_config_with(args, vars, lookup_hostname)
}

/// [`load_config`] with the environment and the hostname lookup supplied by the caller.
pub fn load_config_with<I, H>(
    args: &CliArgs,
    vars: I,
    hostname: H,
) -> Result<ServerConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
    H: FnOnce() -> io::Result<String>,
{
    let mut config = match &args.config {
        Some(path) => load_file(path)?,
        None => ServerConfig::default(),
    };

    args.apply(&mut config)?;

    let vars: BTreeMap<String, String> = vars.into_iter().collect();
    // Only these exact spellings enable it; anything else leaves the setting alone.
    if matches!(vars.get("USE_REAL_HOSTNAME").map(String::as_str), Some("1" | "true")) {
        config.introspection.use_real_hostname = true;
    }
    config.introspection.env.extend(
        vars.into_iter()
            .filter(|(key, _)| key.starts_with(ENV_PASSTHROUGH_PREFIX)),
    );

    if config.introspection.use_real_hostname {
        config.introspection.real_hostname = Some(hostname().map_err(ConfigError::Hostname)?);
    }

    config.routing.allowed_redirect_domains =
        normalize_list(&config.routing.allowed_redirect_domains);
    config.routing.exclude_headers = normalize_list(&config.routing.exclude_headers);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn lookup_hostname() -> io::Result<String> {
    hostname::get()?
        .into_string()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not valid UTF-8"))
}
