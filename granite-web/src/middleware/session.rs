/// Session restore middleware
///
/// Every request gets a [`Client`] in its extensions. The access token is
/// taken from `Authorization: Bearer <token>` or, failing that, the
/// `granite_session` cookie, and validated against the gateway. Requests
/// without a usable token get a client with no session; the access gate
/// decides what that means.

use crate::app::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use granite_shared::client::Client;

/// Cookie carrying the access token for browser sessions
pub const SESSION_COOKIE: &str = "granite_session";

/// Value of cookie `name`, if present
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Access token from the bearer header or the session cookie
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| cookie_value(headers, SESSION_COOKIE).filter(|t| !t.is_empty()))
}

/// `Set-Cookie` value storing the session token
pub fn session_cookie(token: &str, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax{}",
        SESSION_COOKIE,
        token,
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value removing the session token
pub fn cleared_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Restores the caller's session into a [`Client`] request extension
pub async fn attach_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let client = match access_token(req.headers()) {
        Some(token) => match Client::restore(state.gateway.clone(), &token).await {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(error = %err, "Session restore failed, continuing without session");
                state.anonymous_client()
            }
        },
        None => state.anonymous_client(),
    };

    req.extensions_mut().insert(client);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert(header::COOKIE, HeaderValue::from_static("granite_session=cookie-token"));
        assert_eq!(access_token(&headers).as_deref(), Some("header-token"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("darkMode=true; granite_session=abc; other=1"),
        );
        assert_eq!(access_token(&headers).as_deref(), Some("abc"));
        assert_eq!(cookie_value(&headers, "darkMode").as_deref(), Some("true"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(access_token(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        assert!(session_cookie("t", true).ends_with("; Secure"));
        assert!(!session_cookie("t", false).contains("Secure"));
        assert!(cleared_session_cookie().contains("Max-Age=0"));
    }
}
