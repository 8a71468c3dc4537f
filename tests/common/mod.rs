#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use campus_api::app::{router, AppState};
use campus_api::config::{AppConfig, QueryConfig};
use campus_api::context::TenantHandle;
use campus_api::database::MemoryStore;
use campus_api::filter::Document;
use campus_api::models::{register_school_models, ModelRegistry, SchoolModels};

/// In-memory registry with every school model registered.
pub struct TestCampus {
    pub store: Arc<MemoryStore>,
    pub registry: ModelRegistry,
    pub models: SchoolModels,
}

pub fn campus() -> TestCampus {
    let store = Arc::new(MemoryStore::new());
    let registry = ModelRegistry::new(store.clone(), false);
    let models = register_school_models(&registry).expect("school models register");
    TestCampus { store, registry, models }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::from_env();
    config.query = QueryConfig::default();
    config.security.enable_cors = false;
    config.security.enforce_permissions = false;
    config.api.enable_request_logging = false;
    config
}

pub fn app(campus: &TestCampus) -> Router {
    router(AppState::new(campus.registry.clone(), &test_config()))
}

pub fn tenant(slug: &str) -> Option<TenantHandle> {
    TenantHandle::from_slug(slug)
}

pub fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("document literal must be an object")
}

/// Issue one request against the router and decode the JSON body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, json))
}
