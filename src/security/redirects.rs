//! Open-redirect allow-list.
//!
//! # Responsibilities
//! - Hold the configured set of hosts `/redirect-to` may target
//! - Decide whether a client-supplied location is permitted
//!
//! # Design Decisions
//! - Exact, case-sensitive host comparison (port ignored)
//! - Relative targets stay on this server and are always permitted
//! - Network-path references (`//host/...`) are treated as absolute

use url::{ParseError, Url};

use crate::engine::EngineError;

const RELATIVE_BASE: &str = "http://relative.invalid/";

/// Hosts permitted as redirect destinations. Empty means unrestricted.
#[derive(Debug, Clone, Default)]
pub struct RedirectAllowList {
    domains: Vec<String>,
}

impl RedirectAllowList {
    /// Build from configured domains; entries are trimmed and deduplicated.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for domain in domains {
            let domain = domain.as_ref().trim();
            if !domain.is_empty() && !out.iter().any(|d| d == domain) {
                out.push(domain.to_string());
            }
        }
        Self { domains: out }
    }

    pub fn is_restricted(&self) -> bool {
        !self.domains.is_empty()
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn allows_host(&self, host: &str) -> bool {
        !self.is_restricted() || self.domains.iter().any(|d| d == host)
    }

    /// Validate a redirect target. Returns the target unchanged when permitted.
    pub fn check<'a>(&self, target: &'a str) -> Result<&'a str, EngineError> {
        let absolute = match Url::parse(target) {
            Ok(url) => Some(url),
            Err(ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(RELATIVE_BASE)
                    .map_err(|e| EngineError::Internal(e.to_string()))?;
                let resolved = base.join(target).map_err(|e| {
                    EngineError::InvalidParameter(format!("invalid url {target:?}: {e}"))
                })?;
                // A different host after joining means a `//host` style reference.
                (resolved.host_str() != base.host_str()).then_some(resolved)
            }
            Err(e) => {
                return Err(EngineError::InvalidParameter(format!(
                    "invalid url {target:?}: {e}"
                )))
            }
        };

        if let Some(url) = absolute {
            let host = url.host_str().unwrap_or_default();
            if !self.allows_host(host) {
                tracing::warn!(host = %host, "Refusing redirect to host outside allow-list");
                return Err(EngineError::ForbiddenRedirectTarget {
                    host: host.to_string(),
                    allowed: self.domains.clone(),
                });
            }
        }

        Ok(target)
    }
}
