use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET|POST /auth/logout - Revoke the presented token
///
/// Best-effort: with the memory backend the revocation is forgotten on restart,
/// after which the token is accepted again until it expires.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<Value>> {
    state.auth.logout(&user.token).await?;

    Ok(ApiResponse::success(json!({ "revoked": true })))
}
