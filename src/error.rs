// src/error.rs
//! Error type returned by every handler.
//!
//! Client errors carry their message to the caller. Server errors are
//! logged in full and answered with a fixed generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::chatbot::ChatError;
use crate::services::query_validator::ValidationError;
use crate::services::session_manager::SessionError;

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again later.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("session store error: {0}")]
    Session(#[from] SessionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Validation(v) => AppError::Validation(v),
            ChatError::Session(s) => AppError::Session(s),
        }
    }
}

impl From<minijinja::Error> for AppError {
    fn from(e: minijinja::Error) -> Self {
        AppError::Internal(format!("template rendering failed: {e}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(v) => (StatusCode::BAD_REQUEST, v.to_string()),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::Session(e) => {
                error!(error = %e, "chat error");
                (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR.to_owned())
            }
            AppError::Internal(m) => {
                error!(message = %m, "chat error");
                (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR.to_owned())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
