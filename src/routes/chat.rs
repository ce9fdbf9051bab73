use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::Html,
};
use tracing::{info, warn};

use crate::{
    error::AppError,
    message::{ChatRequest, ChatResponse, ClearResponse},
    routes::session::SessionId,
    state::SharedState,
};

pub async fn index_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<Html<String>, AppError> {
    let session = state.chat.session(&session_id).await?;
    let page = state
        .pages
        .render_index(&session, state.config.max_query_length)?;
    Ok(Html(page))
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "rejected chat body");
        AppError::BadRequest("Invalid request body".to_owned())
    })?;

    let exchange = state.chat.chat(&session_id, &payload.query).await?;
    info!(
        session_id = %session_id,
        history_len = exchange.history.len(),
        "chat exchange complete"
    );

    Ok(Json(ChatResponse {
        response: exchange.response,
        history: exchange.history,
    }))
}

pub async fn clear_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<Json<ClearResponse>, AppError> {
    state.chat.clear(&session_id).await?;
    Ok(Json(ClearResponse::success()))
}
