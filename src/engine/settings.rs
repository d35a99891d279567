//! Immutable engine settings shared by every request.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::security::{HeaderFilter, RedirectAllowList};

/// Read-only view of the configuration the engine needs, built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Body ceiling in bytes, both directions.
    pub max_body_size: u64,
    /// Duration ceiling per request.
    pub max_duration: Duration,
    /// Mount prefix, empty or `/x`.
    pub prefix: String,
    /// Whether the listener terminates TLS (affects echoed URLs).
    pub tls: bool,
    pub header_filter: HeaderFilter,
    pub redirect_allow_list: RedirectAllowList,
    /// Variables served by `/env`.
    pub env: BTreeMap<String, String>,
    /// Name served by `/hostname`.
    pub hostname: String,
}

impl Settings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_body_size: config.limits.max_body_size,
            max_duration: config.limits.max_duration,
            prefix: config.routing.prefix.clone(),
            tls: config.listener.tls.is_some(),
            header_filter: HeaderFilter::new(&config.routing.exclude_headers),
            redirect_allow_list: RedirectAllowList::new(&config.routing.allowed_redirect_domains),
            env: config.introspection.env.clone(),
            hostname: config.introspection.hostname().to_owned(),
        }
    }

    /// Join the mount prefix and a route path.
    pub fn path(&self, route: &str) -> String {
        format!("{}{}", self.prefix, route)
    }
}
