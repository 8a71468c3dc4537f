// Ring 2: restricts every model operation to the tenant bound to the
// current execution chain
use async_trait::async_trait;
use serde_json::Value;

use crate::context;
use crate::filter::filter::validate_table_name;
use crate::filter::{Condition, FilterOp};
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{GenericObserver, Observer, ObserverRing};
use crate::scope::{ResolvedScope, ScopePolicy, UnscopedPolicy};
use crate::types::Operation;

/// Resolves the operation's scope from the context carrier and rewrites the
/// target collection, filter and payload to match it.
///
/// | policy       | tenant bound                 | no tenant (default scope)      |
/// |--------------|------------------------------|--------------------------------|
/// | `Collection` | `<base>_<tenant>`            | `<base>`                       |
/// | `Field(f)`   | `f == tenant`, stamped on create | `f` null or missing        |
/// | `Global`     | untouched                    | untouched                      |
pub struct TenantScopeObserver {
    warn_unbound: bool,
}

impl TenantScopeObserver {
    pub fn new(warn_unbound: bool) -> Self {
        Self { warn_unbound }
    }

    fn resolve(&self, ctx: &ObserverContext) -> Result<ResolvedScope, ObserverError> {
        if ctx.model.scope_policy().is_global() {
            return Ok(ResolvedScope::Global);
        }

        if !context::is_established() && self.warn_unbound {
            tracing::warn!(
                "{:?} on '{}' issued outside any tenant context",
                ctx.operation,
                ctx.model_name()
            );
        }

        match (context::current(), ctx.unscoped) {
            (Some(tenant), _) => Ok(ResolvedScope::Tenant(tenant)),
            (None, UnscopedPolicy::DefaultAllowed) => Ok(ResolvedScope::Default),
            (None, UnscopedPolicy::RejectIfUnscoped) => Err(ObserverError::SecurityError(format!(
                "{:?} on '{}' requires a tenant context",
                ctx.operation,
                ctx.model_name()
            ))),
        }
    }

    fn scope_by_field(field: &str, scope: &ResolvedScope, ctx: &mut ObserverContext) {
        let tenant_value = match scope.tenant() {
            Some(tenant) => Value::String(tenant.as_str().to_string()),
            None => Value::Null,
        };

        match ctx.operation {
            Operation::Create => {
                for document in &mut ctx.documents {
                    match &tenant_value {
                        Value::Null => document.remove(field),
                        value => document.insert(field.to_string(), value.clone()),
                    };
                }
            }
            Operation::Update => {
                ctx.patch.remove(field);
                ctx.filter.restrict(Condition::field(field, FilterOp::Eq, tenant_value));
            }
            Operation::Select | Operation::Count | Operation::Delete => {
                ctx.filter.restrict(Condition::field(field, FilterOp::Eq, tenant_value));
            }
        }
    }
}

impl Observer for TenantScopeObserver {
    fn name(&self) -> &'static str {
        "TenantScopeObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl GenericObserver for TenantScopeObserver {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let scope = self.resolve(ctx)?;
        let policy = ctx.model.scope_policy().clone();

        ctx.collection = policy.collection_for(ctx.model.collection(), &scope);
        if validate_table_name(&ctx.collection).is_err() {
            return Err(ObserverError::ValidationError(format!(
                "Collection name '{}' for model '{}' exceeds 63 bytes; use a shorter customer slug",
                ctx.collection,
                ctx.model_name()
            )));
        }
        if let ScopePolicy::Field(field) = &policy {
            Self::scope_by_field(field, &scope, ctx);
        }

        tracing::trace!("{:?} on '{}' scoped to {} ({})", ctx.operation, ctx.model_name(), scope, ctx.collection);
        ctx.scope = Some(scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{establish, TenantHandle};
    use crate::filter::{matcher, Document, Filter};
    use crate::models::ModelDefinition;
    use serde_json::json;
    use std::sync::Arc;

    fn users() -> Arc<ModelDefinition> {
        Arc::new(ModelDefinition::new("users", ScopePolicy::field("customer")))
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn collection_policy_targets_tenant_collection() {
        let model = Arc::new(ModelDefinition::new("students", ScopePolicy::Collection));
        let observer = TenantScopeObserver::new(false);
        let mut ctx = ObserverContext::select(model, Filter::new());

        establish(TenantHandle::from_slug("acme"), observer.execute(&mut ctx)).await.unwrap();
        assert_eq!(ctx.collection, "students_acme");
        assert_eq!(ctx.scope, TenantHandle::from_slug("acme").map(ResolvedScope::Tenant));
    }

    #[tokio::test]
    async fn field_policy_cannot_be_escaped_with_or() {
        let observer = TenantScopeObserver::new(false);
        let filter = Filter::new().where_value(&json!({"$or": [{"customer": "beta"}, {"name": "x"}]})).unwrap();
        let mut ctx = ObserverContext::select(users(), filter);

        establish(TenantHandle::from_slug("acme"), observer.execute(&mut ctx)).await.unwrap();
        let condition = ctx.filter.condition_ref().unwrap();
        assert!(!matcher::matches(&doc(json!({"customer": "beta"})), condition));
        assert!(matcher::matches(&doc(json!({"customer": "acme", "name": "x"})), condition));
    }

    #[tokio::test]
    async fn field_policy_stamps_creates_and_strips_patches() {
        let observer = TenantScopeObserver::new(false);
        let tenant = TenantHandle::from_slug("acme");

        let mut create = ObserverContext::create(users(), vec![doc(json!({"name": "a", "customer": "beta"}))]);
        establish(tenant.clone(), observer.execute(&mut create)).await.unwrap();
        assert_eq!(create.documents[0]["customer"], json!("acme"));

        let mut update = ObserverContext::update(users(), Filter::new(), doc(json!({"customer": "beta", "name": "b"})));
        establish(tenant, observer.execute(&mut update)).await.unwrap();
        assert!(!update.patch.contains_key("customer"));
    }

    #[tokio::test]
    async fn unscoped_policy_decides_missing_tenant() {
        let observer = TenantScopeObserver::new(false);

        let mut allowed = ObserverContext::select(users(), Filter::new());
        establish(None, observer.execute(&mut allowed)).await.unwrap();
        assert_eq!(allowed.scope, Some(ResolvedScope::Default));
        assert!(matcher::matches(&Document::new(), allowed.filter.condition_ref().unwrap()));

        let mut rejected =
            ObserverContext::select(users(), Filter::new()).with_unscoped(UnscopedPolicy::RejectIfUnscoped);
        let err = establish(None, observer.execute(&mut rejected)).await.unwrap_err();
        assert!(matches!(err, ObserverError::SecurityError(_)));
    }

    #[tokio::test]
    async fn global_models_pass_through() {
        let model = Arc::new(ModelDefinition::new("customers", ScopePolicy::Global));
        let observer = TenantScopeObserver::new(false);
        let mut ctx = ObserverContext::select(model, Filter::new());

        establish(TenantHandle::from_slug("acme"), observer.execute(&mut ctx)).await.unwrap();
        assert_eq!(ctx.collection, "customers");
        assert!(ctx.filter.condition_ref().is_none());
    }
}
