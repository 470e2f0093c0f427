//! Usage ingestion and analytics endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireSession;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, MessageResponse};
use crate::domain::api_key::validate_limit;
use crate::domain::usage::{ActivityEntry, CommitEvent, DayActivity, SuccessFailure, UsageSummary};

/// Create the usage router
pub fn create_usage_router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_usage))
        .route("/analytics", get(analytics))
        .route("/activity-logs", get(activity_logs))
        .route("/daywise-analytics", get(daywise_analytics))
        .route("/success-failure", get(success_failure))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUsageBody {
    /// Plaintext API key secret
    pub token: Option<String>,
    pub usage_data: Option<Vec<CommitEvent>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub analytics: UsageSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogsResponse {
    pub success: bool,
    pub activity_logs: Vec<ActivityEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaywiseResponse {
    pub success: bool,
    pub days_wise_analytics: Vec<DayActivity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessFailureResponse {
    pub success: bool,
    pub success_failure: SuccessFailure,
}

/// POST /api/usage/add
pub async fn add_usage(
    State(state): State<AppState>,
    Json(body): Json<AddUsageBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(token), Some(events)) = (body.token.filter(|t| !t.is_empty()), body.usage_data)
    else {
        return Err(ApiError::bad_request("Token and usage data are required"));
    };
    let limit = body
        .limit
        .map(validate_limit)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    state.usage_service.ingest(&token, events, limit).await?;

    Ok(Json(MessageResponse::ok("Usage data added successfully")))
}

/// GET /api/usage/analytics
pub async fn analytics(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let analytics = state.usage_service.summary(&user_id).await?;
    Ok(Json(AnalyticsResponse {
        success: true,
        analytics,
    }))
}

/// GET /api/usage/activity-logs
pub async fn activity_logs(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
) -> Result<Json<ActivityLogsResponse>, ApiError> {
    let activity_logs = state.usage_service.activity(&user_id).await?;
    Ok(Json(ActivityLogsResponse {
        success: true,
        activity_logs,
    }))
}

/// GET /api/usage/daywise-analytics
pub async fn daywise_analytics(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
) -> Result<Json<DaywiseResponse>, ApiError> {
    let days = state.usage_service.daywise(&user_id, Utc::now()).await?;
    Ok(Json(DaywiseResponse {
        success: true,
        days_wise_analytics: days,
    }))
}

/// GET /api/usage/success-failure
pub async fn success_failure(
    State(state): State<AppState>,
    RequireSession(user_id): RequireSession,
) -> Result<Json<SuccessFailureResponse>, ApiError> {
    let totals = state.usage_service.success_failure(&user_id).await?;
    Ok(Json(SuccessFailureResponse {
        success: true,
        success_failure: totals,
    }))
}
