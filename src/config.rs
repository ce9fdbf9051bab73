// src/config.rs
//! Service configuration, loaded from environment variables at startup.

use std::path::PathBuf;

pub const DEFAULT_ALLOWED_CHARS: &str = r"^[\w\s\x1C-\x1F,.?\-()@]+$";

/// Runtime configuration for the SQL chat service.
///
/// Built once in `main` and handed to [`crate::state::AppState`]. Every
/// field has a default so the service starts without any environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind.
    pub bind_address: String,
    /// SQLite file the agent reads from. Opened read-only.
    pub database_path: PathBuf,
    /// Model given to sessions that have not picked one.
    pub default_model: String,
    /// Maximum query length in characters.
    pub max_query_length: usize,
    /// Regex every query must match in full.
    pub allowed_chars: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Model calls the agent may make before giving up.
    pub agent_max_iterations: usize,
    /// Row limit the agent is told to apply to its queries.
    pub agent_top_k: usize,
    /// sqlx URL of the session database; `None` keeps sessions in memory.
    pub session_database_url: Option<String>,
    /// Name of the cookie carrying the session id.
    pub session_cookie: String,
    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,
    /// Emit newline-delimited JSON logs.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_owned(),
            database_path: PathBuf::from("company.db"),
            default_model: "deepseek-r1".to_owned(),
            max_query_length: 200,
            allowed_chars: DEFAULT_ALLOWED_CHARS.to_owned(),
            ollama_url: "http://localhost:11434".to_owned(),
            agent_max_iterations: 15,
            agent_top_k: 10,
            session_database_url: None,
            session_cookie: "sqlbot_session".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env_or("SQLBOT_BIND", &defaults.bind_address),
            database_path: std::env::var("SQLBOT_DATABASE")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            default_model: env_or("SQLBOT_DEFAULT_MODEL", &defaults.default_model),
            max_query_length: parse_env("SQLBOT_MAX_QUERY_LENGTH", defaults.max_query_length),
            allowed_chars: env_or("SQLBOT_ALLOWED_CHARS", &defaults.allowed_chars),
            ollama_url: env_or("SQLBOT_OLLAMA_URL", &defaults.ollama_url),
            agent_max_iterations: parse_env(
                "SQLBOT_AGENT_MAX_ITERATIONS",
                defaults.agent_max_iterations,
            ),
            agent_top_k: parse_env("SQLBOT_AGENT_TOP_K", defaults.agent_top_k),
            session_database_url: std::env::var("SQLBOT_SESSION_DB")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            session_cookie: env_or("SQLBOT_SESSION_COOKIE", &defaults.session_cookie),
            log_level: env_or("SQLBOT_LOG", &defaults.log_level),
            log_json: std::env::var("SQLBOT_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
