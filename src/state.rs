// src/state.rs
use std::sync::Arc;

use crate::config::Config;
use crate::services::agent::AgentFactory;
use crate::services::chatbot::ChatService;
use crate::services::page::PageRenderer;
use crate::services::query_validator::QueryValidator;
use crate::services::session_manager::SessionStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Arc<Config>,
    pub chat: ChatService,
    pub pages: PageRenderer,
}

impl AppState {
    /// Wire the chat service from `config` and the injected backends.
    /// Fails if the allowed-character pattern or the page template is invalid.
    pub fn new(
        config: Config,
        sessions: Arc<dyn SessionStore>,
        agents: Arc<dyn AgentFactory>,
    ) -> anyhow::Result<Self> {
        let validator = QueryValidator::new(config.max_query_length, &config.allowed_chars)?;
        let chat = ChatService::new(sessions, agents, validator, config.default_model.clone());
        Ok(Self {
            config: Arc::new(config),
            chat,
            pages: PageRenderer::new()?,
        })
    }
}
