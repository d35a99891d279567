//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! flags + environment (clap)      config file (TOML, optional)
//!     → loader.rs (merge: flag > env > file > default)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → engine::Settings shared via Arc to every request
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde, clap) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, CliArgs, ConfigError};
pub use schema::{
    IntrospectionConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, RoutingConfig, ServerConfig,
    TlsConfig,
};
