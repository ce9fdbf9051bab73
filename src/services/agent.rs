// src/services/agent.rs
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use super::database::{DatabaseError, SqlDatabase};
use super::ollama::{LanguageModel, LlmError, OllamaClient, OllamaModel};
use super::sql_agent::SqlAgent;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("store unavailable: {0}")]
    Store(#[from] DatabaseError),
    #[error("model unavailable: {0}")]
    Model(#[from] LlmError),
    #[error("agent stopped after {0} iterations without an answer")]
    IterationLimit(usize),
}

/// Something that can answer a natural-language question.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn answer(&self, query: &str) -> Result<String, AgentError>;
}

/// Builds an [`Agent`] for a given model name.
#[async_trait]
pub trait AgentFactory: Send + Sync + 'static {
    async fn create_agent(&self, model: &str) -> Result<Box<dyn Agent>, AgentError>;
}

#[async_trait]
impl<M: LanguageModel + 'static> Agent for SqlAgent<M> {
    async fn answer(&self, query: &str) -> Result<String, AgentError> {
        self.run(query).await.map(|run| run.answer)
    }
}

/// Builds [`SqlAgent`]s that talk to Ollama and read the configured
/// SQLite file. Every agent gets its own freshly opened read-only handle.
#[derive(Debug, Clone)]
pub struct SqlAgentFactory {
    client: OllamaClient,
    database_path: PathBuf,
    max_iterations: usize,
    top_k: usize,
}

impl SqlAgentFactory {
    pub fn new(client: OllamaClient, database_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            database_path: database_path.into(),
            max_iterations: 15,
            top_k: 10,
        }
    }

    pub fn with_limits(mut self, max_iterations: usize, top_k: usize) -> Self {
        self.max_iterations = max_iterations;
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl AgentFactory for SqlAgentFactory {
    async fn create_agent(&self, model: &str) -> Result<Box<dyn Agent>, AgentError> {
        let db = SqlDatabase::open_read_only(&self.database_path).await?;
        if let Err(e) = self.client.show(model).await {
            error!(model, error = %e, "agent creation failed");
            return Err(e.into());
        }
        info!(model, database = %db.path().display(), "sql agent ready");

        let agent = SqlAgent::new(OllamaModel::new(self.client.clone(), model), db)
            .with_max_iterations(self.max_iterations)
            .with_top_k(self.top_k);
        Ok(Box::new(agent))
    }
}
