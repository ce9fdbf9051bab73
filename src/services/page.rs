// src/services/page.rs
use minijinja::{Environment, context};

use super::session_manager::Session;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Server-side renderer for the chat page.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Render the chat page with the session's history and model.
    pub fn render_index(
        &self,
        session: &Session,
        max_query_length: usize,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template("index.html")?.render(context! {
            messages => &session.messages,
            current_model => &session.model,
            max_query_length => max_query_length,
        })
    }
}
