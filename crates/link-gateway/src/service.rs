//! Link gateway service - binds the declared port and serves the API.

use crate::api::{self, AppState};
use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::middleware::MiddlewareStack;
use crate::ports::LinkExtractor;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::info;

/// Link gateway service state
pub struct LinkGatewayService {
    config: GatewayConfig,
    extractor: Arc<dyn LinkExtractor>,
}

impl LinkGatewayService {
    /// Create a new service
    pub fn new(
        config: GatewayConfig,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self { config, extractor })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the router with the full middleware stack
    pub fn router(&self) -> Router {
        let state = AppState {
            extractor: Arc::clone(&self.extractor),
        };
        let stack = MiddlewareStack::from_config(&self.config);

        // Outermost first
        let middleware = ServiceBuilder::new()
            .layer(stack.tracing)
            .layer(stack.cors)
            .layer(stack.trusted_host)
            .layer(stack.api_key)
            .layer(stack.timeout);

        api::routes(state).layer(middleware)
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM
    pub async fn start(self) -> Result<(), GatewayError> {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let router = self.router();

        info!(addr = %addr, "Link gateway listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("Link gateway stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
