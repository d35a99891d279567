//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the server from validated configuration
//! - Load TLS material when configured
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::tls::load_tls_config;

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("listen address {0} did not resolve")]
    Resolve(String),

    #[error("failed to load TLS material: {0}")]
    Tls(std::io::Error),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Serve `config` until `shutdown` fires.
pub async fn serve(config: &ServerConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let server = HttpServer::new(config);
    let address = config.listener.bind_address();

    match &config.listener.tls {
        Some(tls) => {
            let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path))
                .await
                .map_err(StartupError::Tls)?;
            let addr = resolve(&address).await?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&address)
                .await
                .map_err(|source| StartupError::Bind {
                    address: address.clone(),
                    source,
                })?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }
    Ok(())
}

async fn resolve(address: &str) -> Result<SocketAddr, StartupError> {
    tokio::net::lookup_host(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_owned(),
            source,
        })?
        .next()
        .ok_or_else(|| StartupError::Resolve(address.to_owned()))
}
