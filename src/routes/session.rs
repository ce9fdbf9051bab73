// src/routes/session.rs
//! Cookie-keyed session bootstrap run before every session route.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::AppError, state::SharedState};

/// Id of the client session, placed in request extensions by
/// [`session_middleware`].
#[derive(Clone, Debug)]
pub struct SessionId(pub String);

/// Ensure the caller has a session before the handler runs.
///
/// A missing or malformed cookie gets a fresh UUID, and the cookie is set on
/// the way out.
pub async fn session_middleware(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie_name = state.config.session_cookie.as_str();
    let (id, is_new) = match read_cookie(req.headers(), cookie_name) {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    state.chat.session(&id).await?;
    if is_new {
        debug!(session_id = %id, "new session");
    }
    req.extensions_mut().insert(SessionId(id.clone()));

    let mut response = next.run(req).await;
    if is_new {
        let cookie = format!("{cookie_name}={id}; Path=/; HttpOnly; SameSite=Lax");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "could not encode session cookie"),
        }
    }
    Ok(response)
}

/// Value of the `name` cookie when it holds a valid UUID.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| Uuid::parse_str(v.trim()).ok())
        .map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_uuid_cookie_among_others() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; sqlbot_session={id}")).unwrap(),
        );
        assert_eq!(read_cookie(&headers, "sqlbot_session"), Some(id.to_string()));
        assert_eq!(read_cookie(&headers, "other"), None);
    }

    #[test]
    fn rejects_non_uuid_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("sqlbot_session=../../etc/passwd"),
        );
        assert_eq!(read_cookie(&headers, "sqlbot_session"), None);
    }
}
