use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::middleware::{ApiFailure, ApiResponse, ApiResult};
use crate::services::AuthError;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/login - Authenticate and receive a session token
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_at": "2024-01-01T00:10:00Z",
///     "expires_in": 600
///   }
/// }
/// ```
///
/// Unknown user and wrong password give the same `{"success": false, "message": ...}`.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;

    match state.auth.login(&payload.username, &payload.password).await {
        Ok(issued) => Ok(ApiResponse::success(json!({
            "token": issued.token,
            "expires_at": issued.expires_at,
            "expires_in": issued.expires_in(),
        }))
        .into_response()),
        Err(AuthError::InvalidCredentials) => Ok(ApiFailure::new("Invalid username or password").into_response()),
        Err(e) => Err(e.into()),
    }
}
