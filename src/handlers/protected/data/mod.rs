pub mod model;
pub mod record;

pub use model::{model_find, model_get, model_post};
pub use record::{record_delete, record_get, record_patch};

use serde_json::Value;

use crate::error::ApiError;
use crate::filter::Document;

fn expect_object(value: Value) -> Result<Document, ApiError> {
    match value {
        Value::Object(document) => Ok(document),
        _ => Err(ApiError::validation_error("Request body must be a JSON object")),
    }
}
