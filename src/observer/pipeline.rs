use std::collections::HashMap;
use std::time::Instant;

use tokio::time::timeout;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{GenericObserver, ObserverRing};

/// Observer pipeline shared by every registered model. Executes observers in
/// ring order, then by priority within a ring.
pub struct ObserverPipeline {
    observers: HashMap<ObserverRing, Vec<Box<dyn GenericObserver>>>,
}

impl ObserverPipeline {
    pub fn new() -> Self {
        Self { observers: HashMap::new() }
    }

    pub fn register_observer(&mut self, observer: Box<dyn GenericObserver>) {
        let ring = observer.ring();
        let name = observer.name();
        let ring_observers = self.observers.entry(ring).or_default();
        ring_observers.push(observer);
        ring_observers.sort_by_key(|o| o.priority());

        tracing::debug!("Registered observer '{}' for ring {:?}", name, ring);
    }

    /// Names of registered observers in execution order
    pub fn observer_names(&self) -> Vec<&'static str> {
        ObserverRing::ALL
            .iter()
            .filter_map(|ring| self.observers.get(ring))
            .flat_map(|observers| observers.iter().map(|o| o.name()))
            .collect()
    }

    /// Run every applicable observer. The first error recorded in a
    /// pre-database ring stops the pipeline before the store is touched.
    pub async fn execute(&self, mut ctx: ObserverContext) -> Result<ObserverContext, ObserverError> {
        tracing::debug!(
            "Observer pipeline starting: operation={:?}, model={}, collection={}",
            ctx.operation,
            ctx.model_name(),
            ctx.collection
        );

        for ring in ObserverRing::ALL {
            ctx.current_ring = Some(ring);
            self.execute_ring(ring, &mut ctx).await;

            if ctx.has_errors() {
                if ring.is_pre_database() {
                    tracing::debug!("Observer pipeline stopped at ring {:?} due to errors", ring);
                }
                return Err(ctx.errors.remove(0));
            }
        }

        tracing::debug!(
            "Observer pipeline finished: operation={:?}, model={}, collection={}, scope={}, elapsed={:?}",
            ctx.operation,
            ctx.model_name(),
            ctx.collection,
            ctx.scope.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".to_string()),
            ctx.execution_time()
        );
        Ok(ctx)
    }

    async fn execute_ring(&self, ring: ObserverRing, ctx: &mut ObserverContext) {
        let Some(observers) = self.observers.get(&ring) else {
            return;
        };

        for observer in observers {
            if !observer.applies_to_operation(ctx.operation) {
                tracing::trace!("Observer {} skipped for operation {:?}", observer.name(), ctx.operation);
                continue;
            }
            if !observer.applies_to_model(ctx.model_name()) {
                tracing::trace!("Observer {} skipped for model {}", observer.name(), ctx.model_name());
                continue;
            }

            let observer_start = Instant::now();
            let limit = observer.timeout();
            let result = match limit {
                Some(limit) => timeout(limit, observer.execute(ctx)).await,
                None => Ok(observer.execute(ctx).await),
            };
            let execution_time = observer_start.elapsed();

            match result {
                Ok(Ok(())) => {
                    tracing::trace!("Observer {} completed in {:?}", observer.name(), execution_time);
                }
                Ok(Err(error)) => {
                    tracing::warn!("Observer {} failed in {:?}: {}", observer.name(), execution_time, error);
                    ctx.errors.push(error);
                    return;
                }
                Err(_elapsed) => {
                    let limit = limit.unwrap_or_default();
                    tracing::error!("Observer {} timed out after {:?}", observer.name(), limit);
                    ctx.errors.push(ObserverError::TimeoutError(format!(
                        "Observer {} timed out after {:?}",
                        observer.name(),
                        limit
                    )));
                    return;
                }
            }
        }
    }
}

impl Default for ObserverPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelDefinition;
    use crate::observer::traits::Observer;
    use crate::scope::ScopePolicy;
    use crate::types::Operation;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    /// Appends its name to `patch.trace`
    struct Tracer {
        name: &'static str,
        ring: ObserverRing,
        priority: u8,
        fail: bool,
        delay: Option<Duration>,
    }

    impl Tracer {
        fn new(name: &'static str, ring: ObserverRing, priority: u8) -> Self {
            Self { name, ring, priority, fail: false, delay: None }
        }
    }

    impl Observer for Tracer {
        fn name(&self) -> &'static str {
            self.name
        }
        fn ring(&self) -> ObserverRing {
            self.ring
        }
        fn applies_to_operation(&self, op: Operation) -> bool {
            op == Operation::Update
        }
        fn priority(&self) -> u8 {
            self.priority
        }
        fn timeout(&self) -> Option<Duration> {
            Some(Duration::from_millis(50))
        }
    }

    #[async_trait]
    impl GenericObserver for Tracer {
        async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(ObserverError::ValidationError(format!("{} rejected", self.name)));
            }
            let trace = ctx.patch.entry("trace").or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = trace {
                items.push(Value::String(self.name.to_string()));
            }
            Ok(())
        }
    }

    fn update_ctx() -> ObserverContext {
        let model = Arc::new(ModelDefinition::new("students", ScopePolicy::Collection));
        ObserverContext::update(model, crate::filter::Filter::new(), crate::filter::Document::new())
    }

    fn trace(ctx: &ObserverContext) -> Vec<String> {
        ctx.patch["trace"]
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn runs_rings_in_order_then_priority() {
        let mut pipeline = ObserverPipeline::new();
        pipeline.register_observer(Box::new(Tracer::new("business", ObserverRing::Business, 50)));
        pipeline.register_observer(Box::new(Tracer::new("late", ObserverRing::DataPreparation, 90)));
        pipeline.register_observer(Box::new(Tracer::new("early", ObserverRing::DataPreparation, 10)));

        assert_eq!(pipeline.observer_names(), vec!["early", "late", "business"]);
        let ctx = pipeline.execute(update_ctx()).await.unwrap();
        assert_eq!(trace(&ctx), vec!["early", "late", "business"]);
    }

    #[tokio::test]
    async fn first_error_aborts_the_operation() {
        let mut pipeline = ObserverPipeline::new();
        pipeline.register_observer(Box::new(Tracer { fail: true, ..Tracer::new("guard", ObserverRing::Security, 10) }));
        pipeline.register_observer(Box::new(Tracer::new("store", ObserverRing::Database, 50)));

        let err = pipeline.execute(update_ctx()).await.err().unwrap();
        assert!(matches!(err, ObserverError::ValidationError(msg) if msg == "guard rejected"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_observers_time_out() {
        let mut pipeline = ObserverPipeline::new();
        pipeline.register_observer(Box::new(Tracer {
            delay: Some(Duration::from_secs(1)),
            ..Tracer::new("slow", ObserverRing::Enrichment, 50)
        }));

        let err = pipeline.execute(update_ctx()).await.err().unwrap();
        assert!(matches!(err, ObserverError::TimeoutError(_)));
    }

    #[tokio::test]
    async fn observers_skip_other_operations() {
        let mut pipeline = ObserverPipeline::new();
        pipeline.register_observer(Box::new(Tracer { fail: true, ..Tracer::new("guard", ObserverRing::Security, 10) }));

        let model = Arc::new(ModelDefinition::new("students", ScopePolicy::Collection));
        let ctx = ObserverContext::select(model, crate::filter::Filter::new());
        assert!(pipeline.execute(ctx).await.is_ok());
    }
}
