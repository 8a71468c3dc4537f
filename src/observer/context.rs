use std::sync::Arc;
use std::time::Instant;

use crate::filter::{Document, Filter};
use crate::models::ModelDefinition;
use crate::observer::error::ObserverError;
use crate::observer::traits::ObserverRing;
use crate::scope::{ResolvedScope, UnscopedPolicy};
use crate::types::Operation;

/// What the Database ring produced
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    Documents(Vec<Document>),
    Count(u64),
    Affected(u64),
}

/// State of one model operation as it flows through the observer rings
#[derive(Debug)]
pub struct ObserverContext {
    pub operation: Operation,
    pub model: Arc<ModelDefinition>,

    /// Physical collection; starts as the model's base collection and is
    /// rewritten by the scoping observer
    pub collection: String,
    pub filter: Filter,

    /// Documents to insert (Create)
    pub documents: Vec<Document>,
    /// Fields to merge (Update)
    pub patch: Document,

    /// Effective policy for this call site
    pub unscoped: UnscopedPolicy,
    pub scope: Option<ResolvedScope>,

    pub result: Option<OperationResult>,

    pub start_time: Instant,
    pub current_ring: Option<ObserverRing>,
    pub errors: Vec<ObserverError>,
}

impl ObserverContext {
    fn new(operation: Operation, model: Arc<ModelDefinition>) -> Self {
        Self {
            operation,
            collection: model.collection().to_string(),
            unscoped: model.unscoped_policy(),
            model,
            filter: Filter::new(),
            documents: Vec::new(),
            patch: Document::new(),
            scope: None,
            result: None,
            start_time: Instant::now(),
            current_ring: None,
            errors: Vec::new(),
        }
    }

    pub fn select(model: Arc<ModelDefinition>, filter: Filter) -> Self {
        Self { filter, ..Self::new(Operation::Select, model) }
    }

    pub fn count(model: Arc<ModelDefinition>, filter: Filter) -> Self {
        Self { filter: filter.count_only(), ..Self::new(Operation::Count, model) }
    }

    pub fn create(model: Arc<ModelDefinition>, documents: Vec<Document>) -> Self {
        Self { documents, ..Self::new(Operation::Create, model) }
    }

    pub fn update(model: Arc<ModelDefinition>, filter: Filter, patch: Document) -> Self {
        Self { filter, patch, ..Self::new(Operation::Update, model) }
    }

    pub fn delete(model: Arc<ModelDefinition>, filter: Filter) -> Self {
        Self { filter, ..Self::new(Operation::Delete, model) }
    }

    pub fn with_unscoped(mut self, policy: UnscopedPolicy) -> Self {
        self.unscoped = policy;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn execution_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
