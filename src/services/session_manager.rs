// src/services/session_manager.rs
use std::{collections::HashMap, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: MessageRole,
    pub content: String,
}

impl ConversationEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub messages: Vec<ConversationEntry>,
    pub model: String,
}

impl Session {
    pub fn new(model: impl Into<String>) -> Self {
        Self { messages: Vec::new(), model: model.into() }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Keyed per-client session storage.
///
/// Writes to an id that was never ensured create the session with an empty
/// model name rather than failing.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Return the session for `id`, creating it with `default_model` if absent.
    async fn ensure_session(&self, id: &str, default_model: &str) -> Result<Session, SessionError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionError>;

    /// Append to the history. Returns the new history length.
    async fn append_message(
        &self,
        id: &str,
        entry: ConversationEntry,
    ) -> Result<usize, SessionError>;

    /// Drop every entry past the first `len`.
    async fn truncate_messages(&self, id: &str, len: usize) -> Result<(), SessionError>;

    async fn clear_messages(&self, id: &str) -> Result<(), SessionError>;
}

/// In-memory [`SessionStore`]. Sessions live as long as the process.
#[derive(Clone, Default)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for SessionManager {
    async fn ensure_session(&self, id: &str, default_model: &str) -> Result<Session, SessionError> {
        {
            let guard = self.inner.read().await;
            if let Some(session) = guard.get(id) {
                return Ok(session.clone());
            }
        }
        let mut guard = self.inner.write().await;
        let session = guard
            .entry(id.to_owned())
            .or_insert_with(|| Session::new(default_model));
        Ok(session.clone())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn append_message(
        &self,
        id: &str,
        entry: ConversationEntry,
    ) -> Result<usize, SessionError> {
        let mut guard = self.inner.write().await;
        let session = guard
            .entry(id.to_owned())
            .or_insert_with(|| Session::new(String::new()));
        session.messages.push(entry);
        Ok(session.messages.len())
    }

    async fn truncate_messages(&self, id: &str, len: usize) -> Result<(), SessionError> {
        if let Some(session) = self.inner.write().await.get_mut(id) {
            session.messages.truncate(len);
        }
        Ok(())
    }

    async fn clear_messages(&self, id: &str) -> Result<(), SessionError> {
        let mut guard = self.inner.write().await;
        guard
            .entry(id.to_owned())
            .or_insert_with(|| Session::new(String::new()))
            .messages
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_session_flow() {
        let mgr = SessionManager::new();
        let session = mgr.ensure_session("abc", "deepseek-r1").await.unwrap();
        assert!(session.messages.is_empty());
        assert_eq!(session.model, "deepseek-r1");

        let len = mgr
            .append_message("abc", ConversationEntry::user("hello"))
            .await
            .unwrap();
        assert_eq!(len, 1);
        let history = mgr.get_session("abc").await.unwrap().unwrap().messages;
        assert_eq!(history, vec![ConversationEntry::user("hello")]);
        assert_eq!(mgr.len().await, 1);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ConversationEntry::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
