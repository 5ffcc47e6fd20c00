use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::Claims;
use crate::database::models::AccountId;
use crate::error::ApiError;
use crate::services::AuthError;

/// Authenticated caller, injected into request extensions by `jwt_auth_middleware`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub claims: Claims,
    /// The bearer token as presented, needed for logout
    pub token: String,
}

impl AuthUser {
    pub fn account_id(&self) -> AccountId {
        self.claims.account_id()
    }
}

/// JWT authentication middleware that validates tokens and extracts the caller
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;

    let claims = state.auth.verify_token(&token).await.map_err(|e| match e {
        AuthError::InvalidToken => ApiError::unauthorized("Invalid or expired token"),
        other => other.into(),
    })?;

    request.extensions_mut().insert(AuthUser { claims, token });

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
