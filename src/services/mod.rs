pub mod agent;
pub mod chatbot;
pub mod database;
pub mod ollama;
pub mod page;
pub mod query_validator;
pub mod session_manager;
pub mod session_store;
pub mod sql_agent;
