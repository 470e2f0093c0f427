//! Account endpoints
//!
//! Signup, login, current user and logout. Signup and login set the session
//! cookie; logout clears it.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::{RequireSession, SESSION_COOKIE};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, MessageResponse};
use crate::domain::user::User;
use crate::infrastructure::user::SignupRequest;

/// Create the account router
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/create", post(signup))
        .route("/login", post(login))
        .route("/get", get(current_user))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
pub struct SignupBody {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User as returned to clients; never includes the password hash
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub apikeys: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            name: user.name().to_string(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            image_url: user.image_url().map(str::to_string),
            apikeys: user.api_key_ids().iter().map(|id| id.to_string()).collect(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserView,
}

impl UserResponse {
    fn new(user: &User) -> Self {
        Self {
            success: true,
            user: UserView::from(user),
        }
    }
}

fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("All fields are required"))
}

/// Session cookie carrying `token`
pub fn session_cookie(token: String, hours: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::None)
        .secure(secure)
        .max_age(time::Duration::hours(hours as i64))
        .build()
}

fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .same_site(SameSite::None)
        .secure(secure)
        .max_age(time::Duration::ZERO)
        .build()
}

fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, ApiError> {
    let token = state.jwt_service.generate(user)?;
    Ok(jar.add(session_cookie(
        token,
        state.jwt_service.expiration_hours(),
        state.cookie_secure,
    )))
}

/// POST /api/auth/create
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignupBody>,
) -> Result<(StatusCode, CookieJar, Json<UserResponse>), ApiError> {
    let request = SignupRequest {
        name: required(body.name)?,
        username: required(body.username)?,
        email: required(body.email)?,
        password: required(body.password)?,
        image_url: body.image_url.filter(|url| !url.trim().is_empty()),
    };

    let user = state.user_service.signup(request).await?;
    let jar = start_session(&state, jar, &user)?;

    Ok((StatusCode::CREATED, jar, Json(UserResponse::new(&user))))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    let email = required(body.email)?;
    let password = required(body.password)?;

    let user = state.user_service.login(&email, &password).await?;
    let jar = start_session(&state, jar, &user)?;

    info!(user_id = %user.id(), "User logged in");
    Ok((jar, Json(UserResponse::new(&user))))
}

/// GET /api/auth/get
pub async fn current_user(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.get(&user_id).await?;
    Ok(Json(UserResponse::new(&user)))
}

/// GET /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    info!(user_id = %user_id, "User logged out");
    (
        jar.add(cleared_session_cookie(state.cookie_secure)),
        Json(MessageResponse::ok("Logged out successfully")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("jwt".to_string(), 24, true);

        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "jwt");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(1)));
    }

    #[test]
    fn test_cleared_cookie_expires_immediately() {
        let cookie = cleared_session_cookie(false);

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(None).is_err());
        assert!(required(Some("   ".to_string())).is_err());
        assert_eq!(required(Some("ada".to_string())).unwrap(), "ada");
    }

    #[test]
    fn test_user_view_hides_password() {
        let user = User::new(
            crate::domain::user::UserId::new("user-1").unwrap(),
            "Ada",
            "ada",
            "ada@example.com",
            "$argon2id$secret-hash",
        );

        let json = serde_json::to_string(&UserResponse::new(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"username\":\"ada\""));
        assert!(json.contains("\"createdAt\""));
    }
}
