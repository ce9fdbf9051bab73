// src/routes/mod.rs
pub mod chat;
pub mod session;

use crate::state::SharedState;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use chat::{chat_handler, clear_handler, index_handler};
use session::session_middleware;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn create_router(state: SharedState) -> Router {
    let session_routes = Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/clear", post(clear_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .merge(session_routes)
        .route("/health", get(|| async { "OK" }))
        .fallback_service(ServeDir::new("public"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
