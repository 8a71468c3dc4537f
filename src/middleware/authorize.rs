use std::collections::HashMap;
use std::fmt;

use axum::{
    extract::{MatchedPath, Path, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;

/// `<model>:read` or `<model>:write`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission(String);

impl Permission {
    pub fn read(model: &str) -> Self {
        Self(format!("{}:read", model))
    }

    pub fn write(model: &str) -> Self {
        Self(format!("{}:write", model))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn model(&self) -> &str {
        self.0.split_once(':').map(|(model, _)| model).unwrap_or(&self.0)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Yes/no permission check consulted before every data route.
pub trait AuthorizationGate: Send + Sync {
    fn authorize(&self, permission: &Permission, headers: &HeaderMap) -> bool;
}

pub struct AllowAll;

impl AuthorizationGate for AllowAll {
    fn authorize(&self, _permission: &Permission, _headers: &HeaderMap) -> bool {
        true
    }
}

/// Grants whatever the comma-separated `x-permissions` header lists. Entries
/// may be exact (`students:read`), per model (`students:*`) or `*`.
pub struct PermissionHeaderGate {
    header: String,
}

impl PermissionHeaderGate {
    pub fn new(header: impl Into<String>) -> Self {
        Self { header: header.into() }
    }
}

impl Default for PermissionHeaderGate {
    fn default() -> Self {
        Self::new("x-permissions")
    }
}

impl AuthorizationGate for PermissionHeaderGate {
    fn authorize(&self, permission: &Permission, headers: &HeaderMap) -> bool {
        let Some(granted) = headers.get(&self.header).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let model_wildcard = format!("{}:*", permission.model());
        granted
            .split(',')
            .map(str::trim)
            .any(|entry| entry == "*" || entry == permission.as_str() || entry == model_wildcard)
    }
}

/// Route layer deriving the required permission from the model path
/// parameter and the method. Filter searches via `POST .../find` are reads.
pub async fn authorize_middleware(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    matched: Option<MatchedPath>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(model) = params.get("model") else {
        return Ok(next.run(request).await);
    };

    let is_find = matched.as_ref().is_some_and(|m| m.as_str().ends_with("/find"));
    let permission = match *request.method() {
        Method::GET | Method::HEAD => Permission::read(model),
        Method::POST if is_find => Permission::read(model),
        _ => Permission::write(model),
    };

    if !state.gate.authorize(&permission, request.headers()) {
        tracing::warn!("Denied {} {} (requires {})", request.method(), request.uri(), permission);
        return Err(ApiError::forbidden(format!("Missing permission {}", permission)));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_gate_matches_exact_and_wildcards() {
        let gate = PermissionHeaderGate::default();
        let mut headers = HeaderMap::new();
        assert!(!gate.authorize(&Permission::read("students"), &headers));

        headers.insert("x-permissions", HeaderValue::from_static("students:read, classes:*"));
        assert!(gate.authorize(&Permission::read("students"), &headers));
        assert!(!gate.authorize(&Permission::write("students"), &headers));
        assert!(gate.authorize(&Permission::write("classes"), &headers));

        headers.insert("x-permissions", HeaderValue::from_static("*"));
        assert!(gate.authorize(&Permission::write("users"), &headers));
    }
}
