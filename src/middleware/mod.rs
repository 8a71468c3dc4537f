pub mod authorize;
pub mod response;
pub mod tenant;

pub use authorize::{authorize_middleware, AllowAll, AuthorizationGate, Permission, PermissionHeaderGate};
pub use response::{ApiResponse, ApiResult};
pub use tenant::{tenant_context_middleware, tenant_from_headers, RequestTenant};
