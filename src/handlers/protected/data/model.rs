use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde_json::Value;

use super::expect_object;
use crate::app::AppState;
use crate::error::ApiError;
use crate::filter::{Document, Filter, FilterData};
use crate::middleware::{ApiResponse, ApiResult};
use crate::query::{ListQuerySpec, ListResultEnvelope};

/// GET /api/:model - paginated listing, returned without the success envelope
pub async fn model_get(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Query(spec): Query<ListQuerySpec>,
) -> Result<Json<ListResultEnvelope<Document>>, ApiError> {
    let model = state.registry.model(&model)?;
    let envelope = model.advanced_results_with(&spec, &state.query).await?;
    Ok(Json(envelope))
}

/// POST /api/:model - create one document, or many from an array body
pub async fn model_post(
    State(state): State<AppState>,
    Path(model): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let model = state.registry.model(&model)?;
    let Json(body) = body?;

    let created = match body {
        Value::Array(items) => {
            let documents = items.into_iter().map(expect_object).collect::<Result<Vec<_>, _>>()?;
            Value::Array(model.create_many(documents).await?.into_iter().map(Value::Object).collect())
        }
        other => Value::Object(model.create(expect_object(other)?).await?),
    };
    Ok(ApiResponse::created(created))
}

/// POST /api/:model/find - search with a filter body (`select`, `where`,
/// `order`, `limit`, `offset`). `limit` is capped at the configured maximum.
pub async fn model_find(
    State(state): State<AppState>,
    Path(model): Path<String>,
    body: Result<Json<FilterData>, JsonRejection>,
) -> ApiResult<Vec<Document>> {
    let model = state.registry.model(&model)?;
    let Json(mut filter_data) = body?;
    filter_data.limit = filter_data.limit.map(|l| l.min(state.query.max_limit));
    let filter = Filter::assign(filter_data)?;
    Ok(ApiResponse::success(model.find(filter).await?))
}
