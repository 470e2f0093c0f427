//! API key endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{resolve_client_ip, RequireSession};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, MessageResponse};
use crate::domain::api_key::{validate_limit, ApiKey, ApiKeyId, ApiKeyLabel};

/// Create the API key router
pub fn create_keys_router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_key))
        .route("/verify", post(verify_key))
        .route("/get", get(list_keys))
        .route("/delete/{api_key_id}", delete(delete_key))
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyBody {
    pub limit: Option<i64>,
    /// Client-chosen display name of the key
    pub apikey: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyResponse {
    pub success: bool,
    #[serde(rename = "randomAPIkey")]
    pub random_api_key: String,
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyKeyBody {
    #[serde(rename = "randomAPIkey")]
    pub random_api_key: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyKeyDetails {
    pub limit: u32,
    pub apikey: String,
    pub ip: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyKeyResponse {
    pub success: bool,
    pub details: VerifyKeyDetails,
}

/// Stored key as shown on the dashboard; hashes are never exposed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    pub id: String,
    pub apikey: String,
    pub label: ApiKeyLabel,
    pub limit: u32,
    pub ip: Option<String>,
    pub usage_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ApiKey> for ApiKeyView {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id().to_string(),
            apikey: key.display_key().to_string(),
            label: key.label(),
            limit: key.limit(),
            ip: key.ip().map(str::to_string),
            usage_id: key.usage_id().to_string(),
            created_at: key.created_at(),
            updated_at: key.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListKeysResponse {
    pub success: bool,
    pub apikey_details: Vec<ApiKeyView>,
}

/// POST /api/keys/create
pub async fn create_key(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
    Json(body): Json<CreateKeyBody>,
) -> Result<(StatusCode, Json<CreateKeyResponse>), ApiError> {
    let (Some(limit), Some(display_key)) = (body.limit, body.apikey) else {
        return Err(ApiError::bad_request("All fields are required"));
    };
    let limit = validate_limit(limit).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let issued = state
        .api_key_service
        .issue(&user_id, limit, &display_key)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateKeyResponse {
            success: true,
            random_api_key: issued.secret,
            limit: issued.limit,
        }),
    ))
}

/// POST /api/keys/verify
pub async fn verify_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VerifyKeyBody>,
) -> Result<Json<VerifyKeyResponse>, ApiError> {
    let secret = body
        .random_api_key
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Random API key is required"))?;
    let ip = resolve_client_ip(body.ip, &headers);

    let verified = state.api_key_service.verify(&secret, ip).await?;

    Ok(Json(VerifyKeyResponse {
        success: true,
        details: VerifyKeyDetails {
            limit: verified.limit,
            apikey: verified.display_key,
            ip: verified.ip,
        },
    }))
}

/// GET /api/keys/get
pub async fn list_keys(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
) -> Result<Json<ListKeysResponse>, ApiError> {
    let keys = state.api_key_service.list(&user_id).await?;

    Ok(Json(ListKeysResponse {
        success: true,
        apikey_details: keys.iter().map(ApiKeyView::from).collect(),
    }))
}

/// DELETE /api/keys/delete/{apiKeyId}
pub async fn delete_key(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
    Path(api_key_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if api_key_id.trim().is_empty() {
        return Err(ApiError::bad_request("API Key ID is required"));
    }
    let key_id = ApiKeyId::new(api_key_id).map_err(|e| ApiError::bad_request(e.to_string()))?;

    state.api_key_service.delete(&user_id, &key_id).await?;

    Ok(Json(MessageResponse::ok("API Key deleted successfully")))
}
