//! HTTP request & response test server.
//!
//! An httpbin-style service whose endpoint engine enforces two ceilings on every
//! request: body bytes (both directions) and wall-clock duration.

pub mod config;
pub mod engine;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
