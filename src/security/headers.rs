//! Header exclusion for echoed request headers.
//!
//! # Responsibilities
//! - Compile exclusion patterns once at startup
//! - Hide platform-injected headers from display endpoints
//!
//! # Design Decisions
//! - Case-insensitive on header names (names are compared lowercased)
//! - `*` is only meaningful at the start or end of a pattern; no regex
//! - Rule table is immutable after construction (shared without locks)

use axum::http::{HeaderMap, HeaderName, HeaderValue};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    /// `*` on its own.
    Any,
    Exact(String),
    /// `X-Platform-*`
    Prefix(String),
    /// `*-Trace-Id`
    Suffix(String),
}

impl Rule {
    fn compile(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim().to_ascii_lowercase();
        if pattern.is_empty() {
            return None;
        }
        if pattern == "*" {
            return Some(Rule::Any);
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            return Some(Rule::Prefix(prefix.to_string()));
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            return Some(Rule::Suffix(suffix.to_string()));
        }
        Some(Rule::Exact(pattern))
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Rule::Any => true,
            Rule::Exact(exact) => name == exact,
            Rule::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Rule::Suffix(suffix) => name.ends_with(suffix.as_str()),
        }
    }
}

/// Compiled set of header-name exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct HeaderFilter {
    rules: Vec<Rule>,
}

impl HeaderFilter {
    /// Compile a list of patterns. Blank and duplicate patterns are dropped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for rule in patterns.into_iter().filter_map(|p| Rule::compile(p.as_ref())) {
            if !rules.contains(&rule) {
                rules.push(rule);
            }
        }
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns true if a header with this name must not be shown.
    pub fn is_excluded(&self, name: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        // HeaderName is already lowercase; plain &str callers may not be.
        let lowered = name.to_ascii_lowercase();
        self.rules.iter().any(|rule| rule.matches(&lowered))
    }

    /// Iterate over the headers that survive the filter.
    pub fn visible<'a>(
        &'a self,
        headers: &'a HeaderMap,
    ) -> impl Iterator<Item = (&'a HeaderName, &'a HeaderValue)> + 'a {
        headers
            .iter()
            .filter(move |(name, _)| !self.is_excluded(name.as_str()))
    }
}
