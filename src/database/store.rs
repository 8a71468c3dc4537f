use async_trait::async_trait;
use thiserror::Error;

use crate::filter::{Document, Filter, FilterError};

/// Errors raised by document stores. Propagated unchanged to callers; stores
/// never retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Duplicate document id '{id}' in '{collection}'")]
    Duplicate { collection: String, id: String },

    #[error("Document is missing a string _id")]
    MissingId,

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Tenant-agnostic document storage. Collections are created on first use and a
/// missing collection reads as empty. Tenant isolation is applied above this
/// layer by choosing the collection name and restricting the filter.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Counts ignore the filter's projection, ordering and paging.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Every document must already carry a string `_id`. Ids are unique per
    /// value of the `partition` field when one is given, so documents of
    /// different tenants sharing a collection never collide.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        partition: Option<&str>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merge `patch` into every matching document.
    async fn update_many(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

pub(crate) fn document_id(document: &Document) -> Result<&str, StoreError> {
    document.get("_id").and_then(|v| v.as_str()).ok_or(StoreError::MissingId)
}

/// Partition key of a document: the string value of `partition`, or `""` when
/// there is no partition field or the document sits in the default scope.
pub(crate) fn partition_key<'a>(document: &'a Document, partition: Option<&str>) -> &'a str {
    partition.and_then(|field| document.get(field)).and_then(|v| v.as_str()).unwrap_or("")
}
