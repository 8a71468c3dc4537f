// Ambient tenant context carried by each logical operation (one request or one
// background task). Bindings live in a tokio task-local, so they follow the task
// across worker threads and never leak between concurrently running tasks.

pub mod boundary;
pub mod handle;

use std::future::Future;

pub use boundary::{capture, spawn_blocking_scoped, spawn_scoped, CapturedTenant};
pub use handle::{sanitize_slug, TenantHandle};

tokio::task_local! {
    static TENANT: Option<TenantHandle>;
}

/// Run `body` with `tenant` bound as the ambient handle until `body` completes.
///
/// Nested calls shadow the outer binding for the nested future only; the outer
/// handle is visible again once the nested future finishes.
pub async fn establish<F>(tenant: Option<TenantHandle>, body: F) -> F::Output
where
    F: Future,
{
    TENANT.scope(tenant, body).await
}

/// Synchronous counterpart of [`establish`].
pub fn establish_sync<R>(tenant: Option<TenantHandle>, body: impl FnOnce() -> R) -> R {
    TENANT.sync_scope(tenant, body)
}

/// The handle visible at the call site, if any.
pub fn current() -> Option<TenantHandle> {
    TENANT.try_with(|tenant| tenant.clone()).ok().flatten()
}

/// True when the caller runs inside some `establish` call, even one that bound
/// "no tenant". False for code running outside every entry point.
pub fn is_established() -> bool {
    TENANT.try_with(|_| ()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(slug: &str) -> Option<TenantHandle> {
        TenantHandle::from_slug(slug)
    }

    #[tokio::test]
    async fn current_is_none_outside_any_scope() {
        assert!(current().is_none());
        assert!(!is_established());
    }

    #[tokio::test]
    async fn establish_binds_across_awaits() {
        let seen = establish(tenant("acme"), async {
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            current()
        })
        .await;
        assert_eq!(seen, tenant("acme"));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn nested_establish_restores_outer_handle() {
        establish(tenant("outer"), async {
            let inner = establish(tenant("inner"), async { current() }).await;
            assert_eq!(inner, tenant("inner"));
            assert_eq!(current(), tenant("outer"));

            let cleared = establish(None, async { (current(), is_established()) }).await;
            assert_eq!(cleared, (None, true));
            assert_eq!(current(), tenant("outer"));
        })
        .await;
    }

    #[test]
    fn establish_sync_scopes_closure() {
        let seen = establish_sync(tenant("acme"), current);
        assert_eq!(seen, tenant("acme"));
        assert!(current().is_none());
    }
}
