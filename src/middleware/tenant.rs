use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::context::{self, TenantHandle};

/// Tenant resolved for the current request, for handlers that want it
/// explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestTenant(pub Option<TenantHandle>);

/// Request boundary: reads the customer header, establishes the tenant for
/// everything downstream and records it in the request extensions. A missing
/// or empty header means "no tenant".
pub async fn tenant_context_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let tenant = tenant_from_headers(request.headers(), state.tenant_header.as_str());

    tracing::trace!(
        method = %request.method(),
        uri = %request.uri(),
        tenant = tenant.as_ref().map(TenantHandle::as_str).unwrap_or("-"),
        "tenant context"
    );

    request.extensions_mut().insert(RequestTenant(tenant.clone()));
    context::establish(tenant, next.run(request)).await
}

pub fn tenant_from_headers(headers: &HeaderMap, header: &str) -> Option<TenantHandle> {
    let value = headers.get(header)?;
    match value.to_str() {
        Ok(slug) => TenantHandle::from_slug(slug.trim()),
        Err(_) => {
            tracing::warn!("Ignoring non-UTF-8 {} header", header);
            None
        }
    }
}
