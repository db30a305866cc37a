//! HTTP server for the RAG system

pub mod routes;
pub mod state;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{Credentials, RagConfig};
use crate::error::{Error, Result};
use state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new RAG server
    pub fn new(config: RagConfig, credentials: &Credentials) -> Result<Self> {
        let state = AppState::new(config.clone(), credentials)?;
        Ok(Self { config, state })
    }

    /// Create a server around existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Start the server; returns after Ctrl-C
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))?;

        let warm_state = self.state.clone();
        tokio::spawn(async move {
            if let Err(e) = warm_state.ensure_warm().await {
                tracing::warn!("Provider warm-up failed, retrying on first request: {}", e);
            }
        });

        let router = build_router(self.state);

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let server = &state.config().server;
    let enable_cors = server.enable_cors;
    let max_body_size = server.max_body_size;

    let router = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/rag", post(routes::rag::answer))
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Single-page front end
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
