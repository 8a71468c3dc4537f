use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::ApiResponse;

/// GET / - service info and registered models
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let models: Vec<Value> = state
        .registry
        .definitions()
        .iter()
        .map(|d| json!({ "name": d.name(), "scope": d.scope_policy().to_string() }))
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "Campus API",
            "version": env!("CARGO_PKG_VERSION"),
            "tenant_header": state.tenant_header.as_str(),
            "models": models,
        }
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.registry.store();
    match store.health_check().await {
        Ok(()) => ApiResponse::success(json!({ "status": "ok", "store": store.name() })).into_response(),
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": true, "message": "Store unavailable", "code": "SERVICE_UNAVAILABLE" })),
            )
                .into_response()
        }
    }
}
