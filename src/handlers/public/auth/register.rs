use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

// No Debug: the password must never reach a log line
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/register - Create a new account
///
/// Expected Input:
/// ```json
/// { "username": "alice", "password": "pw1" }
/// ```
///
/// Expected Output (201):
/// ```json
/// { "success": true, "data": { "account_id": 1 } }
/// ```
///
/// 400 on invalid username/password, 409 when the username is taken.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Value>> {
    let Json(payload) = payload?;

    let account_id = state.auth.register(&payload.username, &payload.password).await?;

    Ok(ApiResponse::created(json!({ "account_id": account_id })))
}
