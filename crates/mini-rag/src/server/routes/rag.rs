//! Question answering endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{AnswerResult, RagRequest};

/// POST /api/rag - Answer a query over the supplied text
pub async fn answer(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RagRequest>, JsonRejection>,
) -> Result<Json<AnswerResult>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        Error::validation("Invalid JSON in request body")
    })?;
    let request = request.validate()?;

    state.ensure_warm().await?;
    let result = state.pipeline().answer(&request).await?;
    Ok(Json(result))
}
