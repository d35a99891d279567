//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde and clap handle syntactic)
//! - Validate value ranges (ceilings > 0)
//! - Validate the path prefix shape
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Prefix {0:?} must start with a slash")]
    PrefixMissingSlash(String),

    #[error("Prefix {0:?} must not end with a slash")]
    PrefixTrailingSlash(String),

    #[error("max body size must be greater than zero")]
    ZeroBodySize,

    #[error("max duration must be greater than zero")]
    ZeroDuration,
}

/// Check a merged configuration, collecting every failure.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let prefix = &config.routing.prefix;
    if !prefix.is_empty() {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::PrefixMissingSlash(prefix.clone()));
        }
        if prefix.ends_with('/') {
            errors.push(ValidationError::PrefixTrailingSlash(prefix.clone()));
        }
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodySize);
    }
    if config.limits.max_duration.is_zero() {
        errors.push(ValidationError::ZeroDuration);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn prefix_rules() {
        let mut config = ServerConfig::default();

        config.routing.prefix = "invalidprefix1".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "Prefix \"invalidprefix1\" must start with a slash"
        );

        config.routing.prefix = "/invalidprefix2/".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "Prefix \"/invalidprefix2/\" must not end with a slash"
        );

        config.routing.prefix = "/ok".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn reports_every_failure() {
        let mut config = ServerConfig::default();
        config.routing.prefix = "/".into();
        config.limits.max_body_size = 0;
        config.limits.max_duration = Duration::ZERO;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroBodySize));
        assert!(errors.contains(&ValidationError::ZeroDuration));
    }
}
