//! Re-entry helpers for work that leaves the current task.
//!
//! `tokio::spawn`, `spawn_blocking`, plain threads and callback-style libraries
//! all run their continuation somewhere the task-local binding cannot follow.
//! Capture the handle before crossing, rebind it before the continuation runs.

use std::future::Future;

use tokio::task::JoinHandle;

use super::{TenantHandle, TENANT};

/// A tenant binding lifted out of the current execution chain.
#[derive(Debug, Clone)]
pub struct CapturedTenant(Option<TenantHandle>);

/// Snapshot the ambient handle at the call site.
pub fn capture() -> CapturedTenant {
    CapturedTenant(super::current())
}

impl CapturedTenant {
    pub fn tenant(&self) -> Option<&TenantHandle> {
        self.0.as_ref()
    }

    /// Re-associate `future` with the captured handle.
    pub fn rebind<F>(self, future: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        tracing::trace!("Rebinding tenant {:?} onto detached future", self.0);
        TENANT.scope(self.0, future)
    }

    /// Run a synchronous continuation under the captured handle.
    pub fn rebind_sync<R>(&self, body: impl FnOnce() -> R) -> R {
        TENANT.sync_scope(self.0.clone(), body)
    }

    /// Wrap a callback so that, wherever the library ends up invoking it, the
    /// captured handle is bound for the callback's duration.
    pub fn bind_callback<A, R, C>(self, callback: C) -> impl FnOnce(A) -> R
    where
        C: FnOnce(A) -> R,
    {
        move |arg| TENANT.sync_scope(self.0, || callback(arg))
    }
}

/// `tokio::spawn` that carries the caller's tenant into the new task.
pub fn spawn_scoped<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(capture().rebind(future))
}

/// `tokio::task::spawn_blocking` that carries the caller's tenant onto the
/// blocking pool thread.
pub fn spawn_blocking_scoped<F, R>(body: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let captured = capture();
    tokio::task::spawn_blocking(move || captured.rebind_sync(body))
}
