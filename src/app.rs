use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, QueryConfig};
use crate::handlers::{protected::data, public};
use crate::middleware::{
    authorize_middleware, tenant_context_middleware, AllowAll, AuthorizationGate, PermissionHeaderGate,
};
use crate::models::ModelRegistry;

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub registry: ModelRegistry,
    pub gate: Arc<dyn AuthorizationGate>,
    pub tenant_header: HeaderName,
    pub query: QueryConfig,
    pub request_logging: bool,
    pub cors: Option<Vec<String>>,
}

impl AppState {
    pub fn new(registry: ModelRegistry, config: &AppConfig) -> Self {
        let gate: Arc<dyn AuthorizationGate> = if config.security.enforce_permissions {
            Arc::new(PermissionHeaderGate::default())
        } else {
            Arc::new(AllowAll)
        };

        let tenant_header = HeaderName::try_from(config.tenancy.header.as_str()).unwrap_or_else(|_| {
            tracing::warn!("Invalid tenant header '{}'; using x-customer", config.tenancy.header);
            HeaderName::from_static("x-customer")
        });

        Self {
            registry,
            gate,
            tenant_header,
            query: config.query.clone(),
            request_logging: config.api.enable_request_logging,
            cors: config.security.enable_cors.then(|| config.security.cors_origins.clone()),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn AuthorizationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let data_routes = Router::new()
        .route("/api/:model", get(data::model_get).post(data::model_post))
        .route("/api/:model/find", post(data::model_find))
        .route(
            "/api/:model/:id",
            get(data::record_get).patch(data::record_patch).delete(data::record_delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize_middleware));

    let mut app = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(data_routes)
        // Outermost of the app layers: every handler and route layer runs
        // inside the request's tenant context
        .layer(middleware::from_fn_with_state(state.clone(), tenant_context_middleware))
        .with_state(state.clone());

    if let Some(origins) = &state.cors {
        app = app.layer(cors_layer(origins));
    }
    if state.request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    app
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
