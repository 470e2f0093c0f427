//! Session guard for owner-scoped endpoints

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::user::UserId;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Extractor that requires a valid session token.
///
/// The token is read from the `token` cookie, falling back to an
/// `Authorization: Bearer` header. Only the signature and expiry are checked
/// here; no store is touched before the handler runs.
#[derive(Debug, Clone)]
pub struct RequireSession(pub UserId);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Not authorized"))?;

        let claims = state.jwt_service.validate(&token).map_err(|e| {
            debug!(error = %e, "Rejected session token");
            ApiError::unauthorized("Invalid token")
        })?;

        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::unauthorized("Invalid token"))?;

        Ok(RequireSession(user_id))
    }
}

/// Session token from the cookie, else from a bearer header
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; token=abc.def.ghi".parse().unwrap());

        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "token=from-cookie".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());

        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer   spaced-token  ".parse().unwrap());

        assert_eq!(extract_session_token(&headers).as_deref(), Some("spaced-token"));
    }

    #[test]
    fn test_missing_or_cleared_token() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());

        let mut cleared = HeaderMap::new();
        cleared.insert(header::COOKIE, "token=".parse().unwrap());
        assert!(extract_session_token(&cleared).is_none());

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(extract_session_token(&basic).is_none());
    }
}
