use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use thiserror::Error;

use super::definition::ModelDefinition;
use crate::database::DocumentStore;
use crate::filter::filter::validate_table_name;
use crate::filter::{Condition, Document, Filter};
use crate::observer::{default_pipeline, ObserverContext, ObserverError, ObserverPipeline, OperationResult};
use crate::scope::UnscopedPolicy;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Model '{0}' is already registered")]
    DuplicateModel(String),

    #[error("Model '{0}' is not registered")]
    UnknownModel(String),

    #[error("Model '{name}' has an invalid collection name '{collection}'")]
    InvalidCollection { name: String, collection: String },
}

struct RegistryInner {
    store: Arc<dyn DocumentStore>,
    pipeline: ObserverPipeline,
    models: RwLock<BTreeMap<String, Arc<ModelDefinition>>>,
}

/// Explicit model registration. Every model handed out by the registry runs
/// its operations through the shared observer pipeline, so tenant scoping is
/// in place before the first handle exists.
#[derive(Clone)]
pub struct ModelRegistry {
    inner: Arc<RegistryInner>,
}

impl ModelRegistry {
    /// Registry using the standard observer pipeline over `store`.
    pub fn new(store: Arc<dyn DocumentStore>, warn_unbound: bool) -> Self {
        let pipeline = default_pipeline(store.clone(), warn_unbound);
        Self::with_pipeline(store, pipeline)
    }

    pub fn with_pipeline(store: Arc<dyn DocumentStore>, pipeline: ObserverPipeline) -> Self {
        Self {
            inner: Arc::new(RegistryInner { store, pipeline, models: RwLock::new(BTreeMap::new()) }),
        }
    }

    pub fn register(&self, definition: ModelDefinition) -> Result<Model, RegistryError> {
        if validate_table_name(definition.collection()).is_err() {
            return Err(RegistryError::InvalidCollection {
                name: definition.name().to_string(),
                collection: definition.collection().to_string(),
            });
        }

        let mut models = self.inner.models.write().unwrap_or_else(PoisonError::into_inner);
        if models.contains_key(definition.name()) {
            return Err(RegistryError::DuplicateModel(definition.name().to_string()));
        }

        let definition = Arc::new(definition);
        models.insert(definition.name().to_string(), definition.clone());
        tracing::debug!(
            "Registered model '{}' (collection={}, scope={}, unscoped={})",
            definition.name(),
            definition.collection(),
            definition.scope_policy(),
            definition.unscoped_policy()
        );

        Ok(Model { definition, registry: self.clone(), unscoped: None })
    }

    pub fn model(&self, name: &str) -> Result<Model, RegistryError> {
        let models = self.inner.models.read().unwrap_or_else(PoisonError::into_inner);
        models
            .get(name)
            .map(|definition| Model { definition: definition.clone(), registry: self.clone(), unscoped: None })
            .ok_or_else(|| RegistryError::UnknownModel(name.to_string()))
    }

    pub fn definitions(&self) -> Vec<Arc<ModelDefinition>> {
        let models = self.inner.models.read().unwrap_or_else(PoisonError::into_inner);
        models.values().cloned().collect()
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    pub fn pipeline(&self) -> &ObserverPipeline {
        &self.inner.pipeline
    }
}

/// Handle to a registered model. Cheap to clone.
#[derive(Clone)]
pub struct Model {
    definition: Arc<ModelDefinition>,
    registry: ModelRegistry,
    unscoped: Option<UnscopedPolicy>,
}

impl Model {
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Same model with the unscoped policy overridden for this call site.
    pub fn with_unscoped(&self, policy: UnscopedPolicy) -> Self {
        Self { unscoped: Some(policy), ..self.clone() }
    }

    async fn run(&self, ctx: ObserverContext) -> Result<OperationResult, ObserverError> {
        let ctx = match self.unscoped {
            Some(policy) => ctx.with_unscoped(policy),
            None => ctx,
        };
        let operation = ctx.operation;
        self.registry
            .pipeline()
            .execute(ctx)
            .await?
            .result
            .ok_or_else(|| ObserverError::PipelineError(format!("{:?} on '{}' produced no result", operation, self.name())))
    }

    pub async fn find(&self, filter: Filter) -> Result<Vec<Document>, ObserverError> {
        match self.run(ObserverContext::select(self.definition.clone(), filter)).await? {
            OperationResult::Documents(documents) => Ok(documents),
            other => Err(unexpected(other)),
        }
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Option<Document>, ObserverError> {
        let offset = filter.offset_value();
        Ok(self.find(filter.paginate(Some(1), offset)).await?.into_iter().next())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Document>, ObserverError> {
        self.find_one(by_id(id)).await
    }

    pub async fn count(&self, filter: Filter) -> Result<u64, ObserverError> {
        match self.run(ObserverContext::count(self.definition.clone(), filter)).await? {
            OperationResult::Count(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    pub async fn create(&self, document: Document) -> Result<Document, ObserverError> {
        self.create_many(vec![document])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ObserverError::PipelineError(format!("create on '{}' returned nothing", self.name())))
    }

    pub async fn create_many(&self, documents: Vec<Document>) -> Result<Vec<Document>, ObserverError> {
        match self.run(ObserverContext::create(self.definition.clone(), documents)).await? {
            OperationResult::Documents(documents) => Ok(documents),
            other => Err(unexpected(other)),
        }
    }

    pub async fn update_many(&self, filter: Filter, patch: Document) -> Result<u64, ObserverError> {
        match self.run(ObserverContext::update(self.definition.clone(), filter, patch)).await? {
            OperationResult::Affected(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the updated document, or `None` when no document with `id` is
    /// visible in the current scope.
    pub async fn update_by_id(&self, id: &str, patch: Document) -> Result<Option<Document>, ObserverError> {
        if self.update_many(by_id(id), patch).await? == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    pub async fn delete_many(&self, filter: Filter) -> Result<u64, ObserverError> {
        match self.run(ObserverContext::delete(self.definition.clone(), filter)).await? {
            OperationResult::Affected(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the deleted document, or `None` when it was not visible.
    pub async fn delete_by_id(&self, id: &str) -> Result<Option<Document>, ObserverError> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        self.delete_many(by_id(id)).await?;
        Ok(Some(existing))
    }
}

fn by_id(id: &str) -> Filter {
    Filter::new().condition(Some(Condition::eq("_id", Value::String(id.to_string()))))
}

fn unexpected(result: OperationResult) -> ObserverError {
    ObserverError::PipelineError(format!("unexpected operation result: {:?}", result))
}
