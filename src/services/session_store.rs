// src/services/session_store.rs
//! SQLite implementation of [`SessionStore`].
//!
//! History is kept as a JSON array column and edited in place with SQLite's
//! JSON functions, so an append is a single statement. The schema lives in
//! `./migrations` and is embedded at compile time.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::session_manager::{ConversationEntry, Session, SessionError, SessionStore};

/// Persistent session store for production deployments.
#[derive(Clone, Debug)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `url` and run pending migrations.
    ///
    /// `url` is a sqlx SQLite URL such as `"sqlite://sessions.db"`.
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn ensure_session(&self, id: &str, default_model: &str) -> Result<Session, SessionError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO chat_sessions (id, model, messages, created_at, updated_at) \
             VALUES (?1, ?2, '[]', ?3, ?3) ON CONFLICT(id) DO NOTHING",
        )
        .bind(id)
        .bind(default_model)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        match self.get_session(id).await? {
            Some(session) => Ok(session),
            None => Err(SessionError::Database(sqlx::Error::RowNotFound)),
        }
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT model, messages FROM chat_sessions WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((model, messages)) = row else {
            return Ok(None);
        };
        Ok(Some(Session {
            messages: serde_json::from_str(&messages)?,
            model,
        }))
    }

    async fn append_message(
        &self,
        id: &str,
        entry: ConversationEntry,
    ) -> Result<usize, SessionError> {
        let encoded = serde_json::to_string(&entry)?;
        let now = Utc::now().to_rfc3339();
        let (len,): (i64,) = sqlx::query_as(
            "INSERT INTO chat_sessions (id, model, messages, created_at, updated_at) \
             VALUES (?1, '', json_array(json(?2)), ?3, ?3) \
             ON CONFLICT(id) DO UPDATE SET \
                 messages = json_insert(messages, '$[#]', json(?2)), \
                 updated_at = ?3 \
             RETURNING json_array_length(messages)",
        )
        .bind(id)
        .bind(&encoded)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(usize::try_from(len).unwrap_or_default())
    }

    async fn truncate_messages(&self, id: &str, len: usize) -> Result<(), SessionError> {
        let mut tx = self.pool.begin().await?;
        let row: Option<(String,)> =
            sqlx::query_as("SELECT messages FROM chat_sessions WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((messages,)) = row else {
            return Ok(());
        };

        let mut messages: Vec<ConversationEntry> = serde_json::from_str(&messages)?;
        if messages.len() > len {
            messages.truncate(len);
            sqlx::query("UPDATE chat_sessions SET messages = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(serde_json::to_string(&messages)?)
                .bind(Utc::now().to_rfc3339())
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear_messages(&self, id: &str) -> Result<(), SessionError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO chat_sessions (id, model, messages, created_at, updated_at) \
             VALUES (?1, '', '[]', ?2, ?2) \
             ON CONFLICT(id) DO UPDATE SET messages = '[]', updated_at = ?2",
        )
        .bind(id)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
