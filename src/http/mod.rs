//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, prefix mount, middleware stack)
//!     → request.rs (context and metadata extraction, bounded body reads)
//!     → handlers (endpoint logic)
//!     → response.rs / range.rs (echo bodies, byte ranges)
//!     → Send to client
//! ```

pub mod range;
pub mod request;
pub mod response;
pub mod server;

pub use request::RequestMeta;
pub use server::HttpServer;
