#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, header};
use sqlbot_backend::config::Config;
use sqlbot_backend::services::agent::{Agent, AgentError, AgentFactory};
use sqlbot_backend::services::ollama::{LanguageModel, LlmError};
use sqlbot_backend::services::session_manager::SessionManager;
use sqlbot_backend::state::AppState;
use uuid::Uuid;

pub fn temp_db_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sqlbot-{tag}-{}.db", Uuid::new_v4()))
}

/// Agent factory that answers every query with the same canned reply, or
/// fails construction when `reply` is `None`.
pub struct CannedAgents {
    reply: Option<String>,
    pub models: Mutex<Vec<String>>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl CannedAgents {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            models: Mutex::new(Vec::new()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            reply: None,
            models: Mutex::new(Vec::new()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

struct CannedAgent {
    reply: String,
    queries: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Agent for CannedAgent {
    async fn answer(&self, query: &str) -> Result<String, AgentError> {
        self.queries.lock().unwrap().push(query.to_owned());
        Ok(self.reply.clone())
    }
}

#[async_trait]
impl AgentFactory for CannedAgents {
    async fn create_agent(&self, model: &str) -> Result<Box<dyn Agent>, AgentError> {
        self.models.lock().unwrap().push(model.to_owned());
        match &self.reply {
            Some(reply) => Ok(Box::new(CannedAgent {
                reply: reply.clone(),
                queries: Arc::clone(&self.queries),
            })),
            None => Err(AgentError::Model(LlmError::UnknownModel(model.to_owned()))),
        }
    }
}

/// Language model that plays back a fixed list of completions and records
/// every prompt it was given.
pub struct ScriptedModel {
    outputs: Mutex<Vec<String>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn new(outputs: &[&str]) -> Self {
        let mut outputs: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
        outputs.reverse();
        Self {
            outputs: Mutex::new(outputs),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _stop: &[&str]) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        self.outputs
            .lock()
            .unwrap()
            .pop()
            .ok_or(LlmError::EmptyResponse)
    }
}

pub fn app_state(agents: Arc<dyn AgentFactory>) -> (Arc<AppState>, Arc<SessionManager>) {
    let sessions = Arc::new(SessionManager::new());
    let state = AppState::new(Config::default(), sessions.clone(), agents).unwrap();
    (Arc::new(state), sessions)
}

pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_owned)
}

pub fn session_id_from_cookie(cookie: &str) -> String {
    cookie.split_once('=').map(|(_, v)| v.to_owned()).unwrap()
}

pub fn chat_request(cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}
