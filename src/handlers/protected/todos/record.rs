use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;

use crate::app::AppState;
use crate::database::models::{ItemChanges, ItemId};
use crate::middleware::{ApiFailure, ApiResponse, ApiResult, AuthUser};
use crate::services::Mutation;

/// PATCH /todos/:id - Partial update of name, description and/or completed
///
/// Fields left out of the body keep their values. Not-found and not-owner
/// are answered with `{"success": false, "message": ...}`.
pub async fn patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ItemChanges>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(id) = id?;
    let Json(changes) = payload?;
    let item_id = ItemId(id);

    let outcome = state.items.update(item_id, user.account_id(), changes).await?;
    Ok(mutation_response(item_id, outcome, "Please update your own todo"))
}

/// DELETE /todos/:id - Permanently remove an item
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = id?;
    let item_id = ItemId(id);

    let outcome = state.items.delete(item_id, user.account_id()).await?;
    Ok(mutation_response(item_id, outcome, "Please delete your own todo"))
}

fn mutation_response(item_id: ItemId, outcome: Mutation, forbidden_message: &str) -> Response {
    match outcome {
        Mutation::Applied => ApiResponse::success(json!({ "id": item_id })).into_response(),
        Mutation::NotFound => ApiFailure::new("Todo not found").into_response(),
        Mutation::Forbidden => ApiFailure::new(forbidden_message).into_response(),
    }
}
