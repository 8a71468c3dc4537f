// Ring 5: executes the scoped operation against the document store
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::database::DocumentStore;
use crate::observer::context::{ObserverContext, OperationResult};
use crate::observer::error::ObserverError;
use crate::observer::traits::{GenericObserver, Observer, ObserverRing};
use crate::types::Operation;

pub struct StoreExecutor {
    store: Arc<dyn DocumentStore>,
}

impl StoreExecutor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

impl Observer for StoreExecutor {
    fn name(&self) -> &'static str {
        "StoreExecutor"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Database
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    // Store calls finish or fail on their own; the pool's acquire timeout
    // bounds waiting for a connection
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

#[async_trait]
impl GenericObserver for StoreExecutor {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if ctx.scope.is_none() {
            return Err(ObserverError::PipelineError(format!(
                "{:?} on '{}' reached the store without a resolved scope",
                ctx.operation,
                ctx.model_name()
            )));
        }

        let collection = ctx.collection.as_str();
        let result = match ctx.operation {
            Operation::Select => OperationResult::Documents(self.store.find(collection, &ctx.filter).await?),
            Operation::Count => OperationResult::Count(self.store.count(collection, &ctx.filter).await?),
            Operation::Create => {
                let documents = std::mem::take(&mut ctx.documents);
                let partition = ctx.model.scope_policy().partition_field();
                OperationResult::Documents(self.store.insert_many(collection, documents, partition).await?)
            }
            Operation::Update => {
                OperationResult::Affected(self.store.update_many(collection, &ctx.filter, &ctx.patch).await?)
            }
            Operation::Delete => OperationResult::Affected(self.store.delete_many(collection, &ctx.filter).await?),
        };

        tracing::debug!("{} {:?} on {} via {}", ctx.model_name(), ctx.operation, ctx.collection, self.store.name());
        ctx.result = Some(result);
        Ok(())
    }
}
