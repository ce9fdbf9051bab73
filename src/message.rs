// src/message.rs
use serde::{Deserialize, Serialize};

use crate::services::session_manager::ConversationEntry;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub history: Vec<ConversationEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub status: String,
}

impl ClearResponse {
    pub fn success() -> Self {
        Self { status: "success".to_owned() }
    }
}
