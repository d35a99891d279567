//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine, handlers and config produce:
//!     → tracing events with structured fields
//!     → TraceLayer spans per request (http/server.rs)
//!
//! Consumers:
//!     → logging.rs (text or JSON to stdout)
//! ```

pub mod logging;

pub use logging::init_logging;
