// Ring 1: removes system-managed fields from update patches
use async_trait::async_trait;

use super::timestamps::{CREATED_AT, ID_FIELD};
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{GenericObserver, Observer, ObserverRing};
use crate::types::Operation;

#[derive(Default)]
pub struct ImmutableFieldsObserver;

impl Observer for ImmutableFieldsObserver {
    fn name(&self) -> &'static str {
        "ImmutableFieldsObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op == Operation::Update
    }
}

#[async_trait]
impl GenericObserver for ImmutableFieldsObserver {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let model_fields = ctx.model.immutable_fields().to_vec();
        for field in [ID_FIELD, CREATED_AT].iter().map(|f| f.to_string()).chain(model_fields) {
            if ctx.patch.remove(&field).is_some() {
                tracing::debug!("Dropped immutable field '{}' from {} update", field, ctx.model_name());
            }
        }
        Ok(())
    }
}
