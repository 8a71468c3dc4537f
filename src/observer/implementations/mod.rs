// Observer implementations organized by rings

// Ring 0: Data Preparation - ids and timestamps
#[path = "0/timestamps.rs"]
pub mod timestamps;

// Ring 1: Input Validation - immutable fields
#[path = "1/immutable_fields.rs"]
pub mod immutable_fields;

// Ring 2: Security - tenant scoping
#[path = "2/tenant_scope.rs"]
pub mod tenant_scope;

// Ring 5: Database - store execution
#[path = "5/store_executor.rs"]
pub mod store_executor;

pub use immutable_fields::*;
pub use store_executor::*;
pub use tenant_scope::*;
pub use timestamps::*;

use std::sync::Arc;

use crate::database::DocumentStore;
use crate::observer::pipeline::ObserverPipeline;

/// Pipeline with the standard observers every model runs through.
pub fn default_pipeline(store: Arc<dyn DocumentStore>, warn_unbound: bool) -> ObserverPipeline {
    let mut pipeline = ObserverPipeline::new();
    pipeline.register_observer(Box::new(TimestampObserver));
    pipeline.register_observer(Box::new(ImmutableFieldsObserver));
    pipeline.register_observer(Box::new(TenantScopeObserver::new(warn_unbound)));
    pipeline.register_observer(Box::new(StoreExecutor::new(store)));
    pipeline
}
