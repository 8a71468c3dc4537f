use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use super::expect_object;
use crate::app::AppState;
use crate::error::ApiError;
use crate::filter::Document;
use crate::middleware::{ApiResponse, ApiResult};

fn not_found(model: &str, id: &str) -> ApiError {
    ApiError::not_found(format!("{} '{}' not found", model, id))
}

/// GET /api/:model/:id
pub async fn record_get(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
) -> ApiResult<Document> {
    let handle = state.registry.model(&model)?;
    let document = handle.find_by_id(&id).await?.ok_or_else(|| not_found(&model, &id))?;
    Ok(ApiResponse::success(document))
}

/// PATCH /api/:model/:id - shallow merge
pub async fn record_patch(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    let handle = state.registry.model(&model)?;
    let Json(body) = body?;
    let patch = expect_object(body)?;
    let document = handle.update_by_id(&id, patch).await?.ok_or_else(|| not_found(&model, &id))?;
    Ok(ApiResponse::success(document))
}

/// DELETE /api/:model/:id - returns the deleted document
pub async fn record_delete(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
) -> ApiResult<Document> {
    let handle = state.registry.model(&model)?;
    let document = handle.delete_by_id(&id).await?.ok_or_else(|| not_found(&model, &id))?;
    Ok(ApiResponse::success(document))
}
