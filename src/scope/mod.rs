//! Per-model tenant scoping declarations.
//!
//! Every model states how its documents are partitioned between tenants and
//! what an operation does when no tenant is bound. Nothing here is inferred.

use std::fmt;

use serde::Serialize;

use crate::context::TenantHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "lowercase")]
pub enum ScopePolicy {
    /// One physical collection per tenant, named `<base>_<tenant>`. The bare
    /// base collection is the default scope.
    Collection,
    /// One shared collection filtered on the named field. Documents whose
    /// field is null or missing form the default scope.
    Field(String),
    /// Tenant-agnostic model such as the customer registry.
    Global,
}

impl ScopePolicy {
    pub fn field(name: impl Into<String>) -> Self {
        ScopePolicy::Field(name.into())
    }

    pub fn is_global(&self) -> bool {
        matches!(self, ScopePolicy::Global)
    }

    /// Field that partitions a shared collection between tenants.
    pub fn partition_field(&self) -> Option<&str> {
        match self {
            ScopePolicy::Field(name) => Some(name),
            _ => None,
        }
    }

    /// Physical collection an operation in `scope` targets.
    pub fn collection_for(&self, base: &str, scope: &ResolvedScope) -> String {
        match (self, scope) {
            (ScopePolicy::Collection, ResolvedScope::Tenant(tenant)) => tenant_collection(base, tenant),
            _ => base.to_string(),
        }
    }
}

impl fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopePolicy::Collection => write!(f, "collection"),
            ScopePolicy::Field(name) => write!(f, "field({})", name),
            ScopePolicy::Global => write!(f, "global"),
        }
    }
}

/// Behavior of a model operation issued with no tenant bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscopedPolicy {
    /// Run in the model's default scope.
    #[default]
    DefaultAllowed,
    /// Fail with a security error.
    RejectIfUnscoped,
}

impl fmt::Display for UnscopedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnscopedPolicy::DefaultAllowed => write!(f, "default-allowed"),
            UnscopedPolicy::RejectIfUnscoped => write!(f, "reject-if-unscoped"),
        }
    }
}

/// Scope an operation actually ran in, recorded on the observer context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "tenant", rename_all = "lowercase")]
pub enum ResolvedScope {
    Tenant(TenantHandle),
    Default,
    Global,
}

impl ResolvedScope {
    pub fn tenant(&self) -> Option<&TenantHandle> {
        match self {
            ResolvedScope::Tenant(tenant) => Some(tenant),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedScope::Tenant(tenant) => write!(f, "tenant:{}", tenant),
            ResolvedScope::Default => write!(f, "default"),
            ResolvedScope::Global => write!(f, "global"),
        }
    }
}

pub fn tenant_collection(base: &str, tenant: &TenantHandle) -> String {
    format!("{}_{}", base, tenant.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_policy_suffixes_tenant() {
        let acme = TenantHandle::from_slug("Acme").unwrap();
        let policy = ScopePolicy::Collection;
        assert_eq!(policy.collection_for("students", &ResolvedScope::Tenant(acme)), "students_acme");
        assert_eq!(policy.collection_for("students", &ResolvedScope::Default), "students");
    }

    #[test]
    fn field_policy_keeps_shared_collection() {
        let acme = TenantHandle::from_slug("acme").unwrap();
        let policy = ScopePolicy::field("customer");
        assert_eq!(policy.collection_for("users", &ResolvedScope::Tenant(acme)), "users");
        assert_eq!(policy.to_string(), "field(customer)");
    }
}
