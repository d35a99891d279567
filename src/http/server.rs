//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every endpoint
//! - Mount it under the configured prefix
//! - Wire up middleware (constraints, panic recovery, tracing)
//! - Serve plain TCP or TLS until shutdown is triggered

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::engine::{enforce_constraints, EngineError, Settings};
use crate::handlers;

/// HTTP server for the test service.
pub struct HttpServer {
    router: Router,
    settings: Arc<Settings>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ServerConfig) -> Self {
        let settings = Arc::new(Settings::from_config(config));
        let router = Self::build_router(settings.clone());
        Self { router, settings }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(settings: Arc<Settings>) -> Router {
        let routes = handlers::routes().layer(middleware::from_fn_with_state(
            settings.clone(),
            enforce_constraints,
        ));

        let app = if settings.prefix.is_empty() {
            routes
        } else {
            Router::new().nest(&settings.prefix, routes)
        };

        app.layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        self.log_start(addr, false);

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination on `addr`.
    ///
    /// In-flight requests get at most one duration ceiling to finish after shutdown.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        self.log_start(addr, true);

        let handle = Handle::new();
        let grace = self.settings.max_duration;
        tokio::spawn({
            let handle = handle.clone();
            async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
                handle.graceful_shutdown(Some(grace));
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn log_start(&self, addr: SocketAddr, tls: bool) {
        tracing::info!(
            address = %addr,
            tls,
            prefix = %self.settings.prefix,
            max_body_size = self.settings.max_body_size,
            max_duration = ?self.settings.max_duration,
            "HTTP server starting"
        );
    }
}

/// Generic 500 for a panicking handler. The panic message is logged, never sent.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_owned()))
        .unwrap_or_else(|| "unknown panic payload".to_owned());
    EngineError::Internal(format!("handler panicked: {message}")).into_response()
}
