//! API routes for the RAG server

pub mod rag;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/rag", post(rag::answer))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over user-supplied text with numbered source citations",
        "backend": config.backend.to_string(),
        "retrieval": {
            "top_k": config.retrieval.top_k,
            "top_n": config.retrieval.top_n,
            "similarity_threshold": config.retrieval.similarity_threshold,
        },
        "endpoints": {
            "POST /api/rag": "Answer a query over the supplied text",
            "POST /rag": "Alias of POST /api/rag",
            "GET /api/info": "This document",
            "GET /health": "Liveness",
            "GET /ready": "Readiness (providers warmed up)"
        }
    }))
}
