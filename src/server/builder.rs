//! ServerBuilder for fluent API to build the HTTP server

use super::handlers::AppState;
use super::router::build_routes;
use crate::board::Board;
use crate::catalog::CatalogLookups;
use crate::composer::OrderComposer;
use crate::config::AppConfig;
use crate::core::{DataStore, IdentityProvider};
use crate::reporting::{HtmlReportRenderer, ReportRenderer, ReportService};
use crate::session::SessionContext;
use crate::workflow::WorkflowEngine;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the board HTTP server
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .with_config(config)
///     .with_store(InMemoryDataStore::new())
///     .with_identity(InMemoryIdentityProvider::new())
///     .serve("127.0.0.1:3000")
///     .await?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    store: Option<Arc<dyn DataStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    renderer: Option<Arc<dyn ReportRenderer>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            store: None,
            identity: None,
            renderer: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the data store (required)
    pub fn with_store(self, store: impl DataStore + 'static) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    /// Set a data store that is also used outside the server
    pub fn with_shared_store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the identity service; without one the server runs without a session
    pub fn with_identity(mut self, identity: impl IdentityProvider + 'static) -> Self {
        self.identity = Some(Arc::new(identity));
        self
    }

    /// Replace the HTML report renderer
    pub fn with_renderer(mut self, renderer: impl ReportRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Add routes that are not part of the board API
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Assemble the shared handler state
    ///
    /// Resolves the session when an identity service was given.
    pub async fn build_state(&mut self) -> Result<AppState> {
        self.config.validate()?;

        let store = self
            .store
            .clone()
            .ok_or_else(|| anyhow::anyhow!("DataStore is required. Call .with_store()"))?;

        let renderer: Arc<dyn ReportRenderer> = match self.renderer.take() {
            Some(renderer) => renderer,
            None => Arc::new(HtmlReportRenderer::new()?),
        };

        let session = match self.identity.take() {
            Some(identity) => Some(Arc::new(
                SessionContext::init(identity, Arc::clone(&store), &self.config).await,
            )),
            None => None,
        };

        Ok(AppState {
            config: Arc::new(self.config.clone()),
            board: Arc::new(RwLock::new(Board::new())),
            engine: WorkflowEngine::new(Arc::clone(&store), &self.config),
            composer: OrderComposer::new(Arc::clone(&store)),
            catalog: CatalogLookups::new(Arc::clone(&store), &self.config),
            reports: ReportService::new(Arc::clone(&store), &self.config)?,
            renderer,
            session,
            store,
        })
    }

    /// Build the final router with tracing and CORS layers
    pub async fn build(mut self) -> Result<Router> {
        let state = self.build_state().await?;
        Ok(self.router(state))
    }

    fn router(&mut self, state: AppState) -> Router {
        let mut app = build_routes(state);
        for custom_router in std::mem::take(&mut self.custom_routes) {
            app = app.merge(custom_router);
        }
        app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    /// - Stop following principal changes once the server is down
    pub async fn serve(mut self, addr: &str) -> Result<()> {
        let state = self.build_state().await?;
        let session = state.session.clone();
        let app = self.router(state);
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(session) = session {
            session.teardown();
        }
        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDataStore;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ServerBuilder::new();
        assert!(builder.store.is_none());
        assert!(builder.identity.is_none());
        assert!(builder.renderer.is_none());
        assert!(builder.custom_routes.is_empty());
    }

    #[test]
    fn test_with_custom_routes_appends_router() {
        let builder = ServerBuilder::new()
            .with_custom_routes(Router::new())
            .with_custom_routes(Router::new());
        assert_eq!(builder.custom_routes.len(), 2);
    }

    #[tokio::test]
    async fn test_build_without_store_fails() {
        let result = ServerBuilder::new().build().await;
        let err_msg = format!("{}", result.err().expect("should be Err"));
        assert!(
            err_msg.contains("DataStore is required"),
            "error should mention DataStore: {}",
            err_msg
        );
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.reports.timezone = "Mars/Olympus".to_string();
        let result = ServerBuilder::new()
            .with_config(config)
            .with_store(InMemoryDataStore::new())
            .build()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_state_without_identity_has_no_session() {
        let mut builder = ServerBuilder::new().with_store(InMemoryDataStore::new());
        let state = builder.build_state().await.expect("state should build");
        assert!(state.session.is_none());
        assert!(state.board.read().await.orders().is_empty());
    }
}
