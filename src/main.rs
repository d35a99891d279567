//! httpbin: HTTP request & response test server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net (TCP / rustls) ──▶ http::server (router, prefix)
//!                                                  │
//!                                                  ▼
//!                                     engine::middleware (size check,
//!                                     deadline, bounded body, guard)
//!                                                  │
//!                                                  ▼
//!                                     handlers (echo, delay, drip,
//!                                     stream, range, redirects)
//!                                                  │
//!     Client Response                              ▼
//!     ◀────────────── ConstrainedBody (deadline, optional byte ceiling)
//!
//!     Cross-cutting: config (flags > env > TOML > defaults), security
//!     (header filter, redirect allow-list), observability, lifecycle
//! ```

use clap::Parser;

use httpbin::config::{load_config, CliArgs};
use httpbin::lifecycle::{self, signals, Shutdown};
use httpbin::observability::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address(),
        tls = config.listener.tls.is_some(),
        prefix = %config.routing.prefix,
        max_body_size = config.limits.max_body_size,
        max_duration = ?config.limits.max_duration,
        allowed_redirect_domains = ?config.routing.allowed_redirect_domains,
        exclude_headers = ?config.routing.exclude_headers,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    lifecycle::serve(&config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
