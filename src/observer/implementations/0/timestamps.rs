// Ring 0: assigns document ids and maintains created_at / updated_at
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{GenericObserver, Observer, ObserverRing};
use crate::types::Operation;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

#[derive(Default)]
pub struct TimestampObserver;

impl Observer for TimestampObserver {
    fn name(&self) -> &'static str {
        "TimestampObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }
}

#[async_trait]
impl GenericObserver for TimestampObserver {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let now = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

        match ctx.operation {
            Operation::Create => {
                for document in &mut ctx.documents {
                    match document.get(ID_FIELD) {
                        None | Some(Value::Null) => {
                            document.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
                        }
                        Some(Value::String(id)) if !id.is_empty() => {}
                        Some(other) => {
                            return Err(ObserverError::ValidationError(format!(
                                "_id must be a non-empty string, got {}",
                                other
                            )));
                        }
                    }
                    document.insert(CREATED_AT.to_string(), now.clone());
                    document.insert(UPDATED_AT.to_string(), now.clone());
                }
            }
            Operation::Update => {
                ctx.patch.insert(UPDATED_AT.to_string(), now);
            }
            _ => {}
        }
        Ok(())
    }
}
