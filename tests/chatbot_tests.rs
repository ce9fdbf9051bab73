mod common;

use std::sync::Arc;

use common::CannedAgents;
use sqlbot_backend::config::DEFAULT_ALLOWED_CHARS;
use sqlbot_backend::services::chatbot::{ChatError, ChatService, NO_MATCH_RESPONSE};
use sqlbot_backend::services::query_validator::{QueryValidator, ValidationError};
use sqlbot_backend::services::session_manager::{
    ConversationEntry, MessageRole, SessionManager, SessionStore,
};

fn service(agents: Arc<CannedAgents>) -> (ChatService, Arc<SessionManager>) {
    let sessions = Arc::new(SessionManager::new());
    let validator = QueryValidator::new(200, DEFAULT_ALLOWED_CHARS).unwrap();
    let chat = ChatService::new(sessions.clone(), agents, validator, "deepseek-r1");
    (chat, sessions)
}

#[tokio::test]
async fn test_valid_query_appends_exactly_two_entries() {
    let agents = Arc::new(CannedAgents::replying("Three employees."));
    let (chat, _) = service(agents.clone());

    for (i, query) in ["How many employees?", "Who earns most?", "List hires in 2021"]
        .iter()
        .enumerate()
    {
        let exchange = chat.chat("s1", query).await.unwrap();
        assert_eq!(exchange.history.len(), 2 * (i + 1));

        let tail = &exchange.history[exchange.history.len() - 2..];
        assert_eq!(tail[0], ConversationEntry::user(*query));
        assert_eq!(tail[1].role, MessageRole::Assistant);
        assert_eq!(tail[1].content, exchange.response);
    }

    assert_eq!(agents.models.lock().unwrap().as_slice(), ["deepseek-r1"; 3]);
}

#[tokio::test]
async fn test_query_is_trimmed_before_use() {
    let agents = Arc::new(CannedAgents::replying("ok"));
    let (chat, _) = service(agents.clone());

    let exchange = chat.chat("s1", "   Who is Bob?  ").await.unwrap();
    assert_eq!(exchange.history[0], ConversationEntry::user("Who is Bob?"));
    assert_eq!(agents.queries.lock().unwrap().as_slice(), ["Who is Bob?"]);
}

#[tokio::test]
async fn test_over_length_queries_are_rejected() {
    let (chat, sessions) = service(Arc::new(CannedAgents::replying("unused")));

    for len in [201, 250, 1000] {
        let err = chat.chat("s1", &"x".repeat(len)).await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::Validation(ValidationError::TooLong { max: 200 })
        ));
    }
    let exact = chat.chat("s1", &"x".repeat(200)).await;
    assert!(exact.is_ok());

    let history = sessions.get_session("s1").await.unwrap().unwrap().messages;
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_disallowed_characters_are_rejected() {
    let (chat, sessions) = service(Arc::new(CannedAgents::replying("unused")));

    for query in ["a;b", "1 < 2", "$salary", "name = 'Bob'", "x*", "50%", "a\"b", "#1"] {
        let err = chat.chat("s1", query).await.unwrap_err();
        assert!(
            matches!(err, ChatError::Validation(ValidationError::InvalidCharacters)),
            "{query:?} should be rejected"
        );
    }
    assert!(
        sessions
            .get_session("s1")
            .await
            .unwrap()
            .is_none_or(|s| s.messages.is_empty())
    );
}

#[tokio::test]
async fn test_sql_keywords_pass_validation() {
    // Only the read-only store stands between this text and the database.
    let agents = Arc::new(CannedAgents::replying("I cannot modify the database."));
    let (chat, _) = service(agents.clone());

    let exchange = chat.chat("s1", "DROP TABLE Employees").await.unwrap();
    assert_eq!(exchange.history.len(), 2);
    assert_eq!(agents.queries.lock().unwrap().as_slice(), ["DROP TABLE Employees"]);
}

#[tokio::test]
async fn test_no_results_replacement_is_verbatim() {
    let (chat, _) = service(Arc::new(CannedAgents::replying(
        "```sql\nSELECT * FROM Employees WHERE Department = 'Legal'\n```\nNo results.",
    )));
    let exchange = chat.chat("s1", "Who works in Legal?").await.unwrap();
    assert_eq!(exchange.response, NO_MATCH_RESPONSE);
    assert_eq!(exchange.history[1].content, NO_MATCH_RESPONSE);
}

#[tokio::test]
async fn test_clear_always_empties_history() {
    let (chat, sessions) = service(Arc::new(CannedAgents::replying("ok")));

    chat.clear("never-seen").await.unwrap();
    assert!(
        sessions
            .get_session("never-seen")
            .await
            .unwrap()
            .unwrap()
            .messages
            .is_empty()
    );

    chat.chat("s1", "Who is Alice?").await.unwrap();
    chat.chat("s1", "Who is Bob?").await.unwrap();
    chat.clear("s1").await.unwrap();
    chat.clear("s1").await.unwrap();
    let session = sessions.get_session("s1").await.unwrap().unwrap();
    assert!(session.messages.is_empty());
    assert_eq!(session.model, "deepseek-r1");
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (chat, _) = service(Arc::new(CannedAgents::replying("ok")));

    chat.chat("a", "Who is Alice?").await.unwrap();
    let b = chat.chat("b", "Who is Bob?").await.unwrap();
    assert_eq!(b.history.len(), 2);
    assert_eq!(b.history[0], ConversationEntry::user("Who is Bob?"));
}

#[tokio::test]
async fn test_session_model_is_used_for_agent() {
    let agents = Arc::new(CannedAgents::replying("ok"));
    let (chat, sessions) = service(agents.clone());

    sessions.ensure_session("s1", "llama3.2").await.unwrap();
    chat.chat("s1", "Who is Alice?").await.unwrap();
    assert_eq!(agents.models.lock().unwrap().as_slice(), ["llama3.2"]);
}
