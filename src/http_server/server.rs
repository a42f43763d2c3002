//! # HTTP Server
//!
//! Binds the playground router with CORS and request tracing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::ApiKeyGate;
use crate::playground::{self, PlaygroundState, Registry};

use super::config::HttpServerConfig;

/// HTTP server for the playground
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server over `registry`, guarded by `gate`
    pub fn new(config: HttpServerConfig, registry: Arc<Registry>, gate: ApiKeyGate) -> Self {
        let router = Self::build_router(&config, registry, gate);
        Self { config, router }
    }

    fn build_router(config: &HttpServerConfig, registry: Arc<Registry>, gate: ApiKeyGate) -> Router {
        let state = PlaygroundState::new(registry, gate, &config.base_path);

        playground::router(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.cors_origins))
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        info!(
            %addr,
            base_path = %self.config.base_path,
            require_api_key = self.config.require_api_key,
            "playground listening"
        );

        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

/// Permissive when no origins are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}
