use std::collections::BTreeMap;

use serde::Serialize;

use crate::scope::{ScopePolicy, UnscopedPolicy};

/// Static description of a data model: where its documents live, how they
/// are partitioned between tenants and which fields reference other models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDefinition {
    name: String,
    collection: String,
    scope: ScopePolicy,
    unscoped: UnscopedPolicy,
    relations: BTreeMap<String, String>,
    immutable_fields: Vec<String>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, scope: ScopePolicy) -> Self {
        let name = name.into();
        Self {
            collection: name.clone(),
            name,
            scope,
            unscoped: UnscopedPolicy::default(),
            relations: BTreeMap::new(),
            immutable_fields: Vec::new(),
        }
    }

    /// Base collection name, when it differs from the model name.
    pub fn collection_name(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn unscoped(mut self, policy: UnscopedPolicy) -> Self {
        self.unscoped = policy;
        self
    }

    /// Declare that `path` holds the id (or ids) of documents in `model`.
    pub fn relation(mut self, path: impl Into<String>, model: impl Into<String>) -> Self {
        self.relations.insert(path.into(), model.into());
        self
    }

    pub fn immutable(mut self, field: impl Into<String>) -> Self {
        self.immutable_fields.push(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn scope_policy(&self) -> &ScopePolicy {
        &self.scope
    }

    pub fn unscoped_policy(&self) -> UnscopedPolicy {
        self.unscoped
    }

    pub fn relation_target(&self, path: &str) -> Option<&str> {
        self.relations.get(path).map(String::as_str)
    }

    pub fn relations(&self) -> &BTreeMap<String, String> {
        &self.relations
    }

    pub fn immutable_fields(&self) -> &[String] {
        &self.immutable_fields
    }
}
