// src/services/chatbot.rs
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use super::agent::AgentFactory;
use super::query_validator::{QueryValidator, ValidationError};
use super::session_manager::{ConversationEntry, Session, SessionError, SessionStore};

pub const DEGRADED_RESPONSE: &str =
    "I encountered an error processing your request. Please check your input and try again.";
pub const EMPTY_RESPONSE: &str = "No results found for your query.";
pub const NO_MATCH_RESPONSE: &str =
    "No matching records found. Please check your input parameters.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result of one chat exchange.
#[derive(Debug, Clone)]
pub struct ChatExchange {
    pub response: String,
    pub history: Vec<ConversationEntry>,
}

/// Turns raw agent output into what the user sees.
///
/// SQL code fences are removed; an empty answer and any answer mentioning
/// "no results" are replaced with fixed messages.
pub fn clean_response(raw: &str) -> String {
    let cleaned = raw.replace("```sql", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        EMPTY_RESPONSE.to_owned()
    } else if cleaned.to_lowercase().contains("no results") {
        NO_MATCH_RESPONSE.to_owned()
    } else {
        cleaned.to_owned()
    }
}

/// The chat exchange and history reset, over injectable session storage
/// and agent construction.
#[derive(Clone)]
pub struct ChatService {
    sessions: Arc<dyn SessionStore>,
    agents: Arc<dyn AgentFactory>,
    validator: QueryValidator,
    default_model: String,
}

impl ChatService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        agents: Arc<dyn AgentFactory>,
        validator: QueryValidator,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            agents,
            validator,
            default_model: default_model.into(),
        }
    }

    /// Session for `session_id`, created with the default model if absent.
    pub async fn session(&self, session_id: &str) -> Result<Session, SessionError> {
        self.sessions
            .ensure_session(session_id, &self.default_model)
            .await
    }

    /// Validate `raw_query`, ask the session's agent and record both sides.
    ///
    /// Invalid queries leave the session untouched. Agent failures become
    /// [`DEGRADED_RESPONSE`] and are recorded like any other answer.
    pub async fn chat(&self, session_id: &str, raw_query: &str) -> Result<ChatExchange, ChatError> {
        let query = self.validator.validate(raw_query)?;
        let session = self.session(session_id).await?;

        let before = session.messages.len();
        self.sessions
            .append_message(session_id, ConversationEntry::user(query))
            .await?;

        let answer = self.ask_agent(&session.model, query).await;
        let response = clean_response(&answer);

        if let Err(e) = self
            .sessions
            .append_message(session_id, ConversationEntry::assistant(response.as_str()))
            .await
        {
            if let Err(rollback) = self.sessions.truncate_messages(session_id, before).await {
                warn!(error = %rollback, "failed to roll back user entry");
            }
            return Err(e.into());
        }

        let history = self
            .sessions
            .get_session(session_id)
            .await?
            .map(|s| s.messages)
            .unwrap_or_default();

        Ok(ChatExchange { response, history })
    }

    /// Empty the session's history.
    pub async fn clear(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions.clear_messages(session_id).await
    }

    async fn ask_agent(&self, model: &str, query: &str) -> String {
        let agent = match self.agents.create_agent(model).await {
            Ok(agent) => agent,
            Err(e) => {
                error!(model, error = %e, "agent unavailable");
                return DEGRADED_RESPONSE.to_owned();
            }
        };

        match agent.answer(query).await {
            Ok(answer) => {
                info!(model, answer_len = answer.len(), "agent answered");
                answer
            }
            Err(e) => {
                error!(model, error = %e, "query processing error");
                DEGRADED_RESPONSE.to_owned()
            }
        }
    }
}
