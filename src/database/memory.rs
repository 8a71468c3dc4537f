use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{document_id, partition_key, DocumentStore, StoreError};
use crate::filter::filter::validate_table_name;
use crate::filter::matcher::{matches, project, sort_documents};
use crate::filter::{Document, Filter};

/// Process-local store used in development and tests. Documents keep insertion
/// order unless the filter sorts them. Collection names follow the same rules
/// as Postgres table names.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every collection that has been written to.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Raw contents of one physical collection, bypassing any scoping.
    pub async fn raw(&self, collection: &str) -> Vec<Document> {
        self.collections.read().await.get(collection).cloned().unwrap_or_default()
    }

    fn is_match(document: &Document, filter: &Filter) -> bool {
        filter.condition_ref().map(|c| matches(document, c)).unwrap_or(true)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        validate_table_name(collection)?;
        let mut found: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .map(|docs| docs.iter().filter(|d| Self::is_match(d, filter)).cloned().collect())
                .unwrap_or_default()
        };

        sort_documents(&mut found, filter.order_ref());

        let skip = usize::try_from(filter.offset_value()).unwrap_or(usize::MAX);
        let take = filter
            .limit_value()
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(found
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|d| project(d, filter.projection_ref()))
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        validate_table_name(collection)?;
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| Self::is_match(d, filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        partition: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        validate_table_name(collection)?;
        let mut collections = self.collections.write().await;
        let existing = collections.entry(collection.to_string()).or_default();

        let same_key = |d: &Document, id: &str, key: &str| {
            d.get("_id").and_then(|v| v.as_str()) == Some(id) && partition_key(d, partition) == key
        };
        for (index, document) in documents.iter().enumerate() {
            let id = document_id(document)?;
            let key = partition_key(document, partition);
            let clashes_existing = existing.iter().any(|d| same_key(d, id, key));
            let clashes_batch = documents[..index].iter().any(|d| same_key(d, id, key));
            if clashes_existing || clashes_batch {
                return Err(StoreError::Duplicate { collection: collection.to_string(), id: id.to_string() });
            }
        }

        existing.extend(documents.iter().cloned());
        Ok(documents)
    }

    async fn update_many(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<u64, StoreError> {
        validate_table_name(collection)?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut updated = 0;
        for document in docs.iter_mut().filter(|d| Self::is_match(d, filter)) {
            for (key, value) in patch {
                document.insert(key.clone(), value.clone());
            }
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        validate_table_name(collection)?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !Self::is_match(d, filter));
        Ok((before - docs.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
