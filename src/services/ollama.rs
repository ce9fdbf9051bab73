// src/services/ollama.rs
//! Minimal client for the Ollama HTTP API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to model runtime failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model runtime returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("model {0} is not available")]
    UnknownModel(String),
    #[error("empty response from model runtime")]
    EmptyResponse,
    #[error("malformed response from model runtime: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Text completion with stop sequences. The agent loop only needs this,
/// which lets tests drive it with scripted output.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Serialize)]
struct GenerateOptions<'a> {
    temperature: f32,
    stop: &'a [&'a str],
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for interacting with Ollama's HTTP API
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// `base_url` is the server root, e.g. `"http://localhost:11434"`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    /// Check that `model` is installed on the runtime.
    pub async fn show(&self, model: &str) -> Result<(), LlmError> {
        let endpoint = format!("{}/api/show", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::NOT_FOUND {
            Err(LlmError::UnknownModel(model.to_owned()))
        } else {
            Err(LlmError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    /// Non-streaming completion at temperature 0.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        stop: &[&str],
    ) -> Result<String, LlmError> {
        let endpoint = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                stop,
            },
        };

        let response = self.client.post(&endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let text = response.text().await?;
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        Ok(parsed.response)
    }
}

/// An [`OllamaClient`] bound to one model.
#[derive(Debug, Clone)]
pub struct OllamaModel {
    client: OllamaClient,
    model: String,
}

impl OllamaModel {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String, LlmError> {
        self.client.generate(&self.model, prompt, stop).await
    }
}
