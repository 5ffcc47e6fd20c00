use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Item;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// GET /todos - All items of the caller; `[]` when there are none
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<Vec<Item>>> {
    let items = state.items.list(user.account_id()).await?;
    Ok(ApiResponse::success(items))
}

/// POST /todos - Create an item owned by the caller
///
/// Expected Input:
/// ```json
/// { "name": "buy milk", "description": "" }
/// ```
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Value>> {
    let Json(payload) = payload?;

    let id = state
        .items
        .create(user.account_id(), payload.name, payload.description)
        .await?;

    Ok(ApiResponse::created(json!({ "id": id })))
}
