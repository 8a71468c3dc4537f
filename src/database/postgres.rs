use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::store::{document_id, partition_key, DocumentStore, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::filter::validate_table_name;
use crate::filter::filter_sql::{quote_identifier, FilterSql};
use crate::filter::matcher::project;
use crate::filter::{Document, Filter, SqlResult};

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres document store. Each collection is a table of
/// `(part TEXT, id TEXT, doc JSONB, created_at TIMESTAMPTZ)` keyed on
/// `(part, id)`, created on first use. `part` holds the partition field's
/// value for field-scoped collections and `''` otherwise.
pub struct PgStore {
    pool: PgPool,
    ensured: RwLock<HashSet<String>>,
    query_logging: bool,
    slow_query_threshold: Option<Duration>,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;
        info!("Connected Postgres document store (max_connections={})", config.max_connections);

        let mut store = Self::from_pool(pool);
        store.query_logging = config.enable_query_logging;
        store.slow_query_threshold = config
            .enable_slow_query_warning
            .then(|| Duration::from_millis(config.slow_query_threshold_ms));
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool, ensured: RwLock::new(HashSet::new()), query_logging: false, slow_query_threshold: None }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed Postgres document store");
    }

    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        validate_table_name(collection)?;
        {
            let ensured = self.ensured.read().await;
            if ensured.contains(collection) {
                return Ok(());
            }
        }

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (part TEXT NOT NULL DEFAULT '', id TEXT NOT NULL, doc JSONB NOT NULL, created_at TIMESTAMPTZ NOT NULL DEFAULT now(), PRIMARY KEY (part, id))",
            quote_identifier(collection)
        );
        sqlx::query(&ddl).execute(&self.pool).await?;

        self.ensured.write().await.insert(collection.to_string());
        debug!("Ensured collection table {}", collection);
        Ok(())
    }

    fn bind_params<'q>(
        mut query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
        params: &[Value],
    ) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
        for param in params {
            query = query.bind(Json(param.clone()));
        }
        query
    }

    fn observe(&self, sql: &SqlResult, started: Instant) {
        let elapsed = started.elapsed();
        if self.query_logging {
            debug!(elapsed_ms = elapsed.as_millis() as u64, params = sql.params.len(), "{}", sql.query);
        }
        if let Some(threshold) = self.slow_query_threshold {
            if elapsed > threshold {
                warn!("Slow query ({} ms): {}", elapsed.as_millis(), sql.query);
            }
        }
    }

    async fn fetch_rows(&self, sql: &SqlResult) -> Result<Vec<PgRow>, StoreError> {
        let started = Instant::now();
        let rows = Self::bind_params(sqlx::query(&sql.query), &sql.params).fetch_all(&self.pool).await?;
        self.observe(sql, started);
        Ok(rows)
    }

    async fn execute(&self, sql: &SqlResult) -> Result<u64, StoreError> {
        let started = Instant::now();
        let result = Self::bind_params(sqlx::query(&sql.query), &sql.params).execute(&self.pool).await?;
        self.observe(sql, started);
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.ensure_collection(collection).await?;
        let sql = filter.to_sql(collection)?;
        let rows = self.fetch_rows(&sql).await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(document): Json<Document> = row.try_get("doc")?;
            documents.push(project(document, filter.projection_ref()));
        }
        Ok(documents)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.ensure_collection(collection).await?;
        let sql = filter.count_only().to_count_sql(collection)?;
        let rows = self.fetch_rows(&sql).await?;
        let count: i64 = match rows.first() {
            Some(row) => row.try_get("count")?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        partition: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        self.ensure_collection(collection).await?;
        let statement = format!("INSERT INTO {} (part, id, doc) VALUES ($1, $2, $3)", quote_identifier(collection));

        let mut tx = self.pool.begin().await?;
        for document in &documents {
            let id = document_id(document)?;
            let result = sqlx::query(&statement)
                .bind(partition_key(document, partition))
                .bind(id)
                .bind(Json(document))
                .execute(&mut *tx)
                .await;
            if let Err(err) = result {
                let duplicate = err
                    .as_database_error()
                    .and_then(|db| db.code())
                    .is_some_and(|code| code == UNIQUE_VIOLATION);
                return Err(if duplicate {
                    StoreError::Duplicate { collection: collection.to_string(), id: id.to_string() }
                } else {
                    StoreError::Sqlx(err)
                });
            }
        }
        tx.commit().await?;
        Ok(documents)
    }

    async fn update_many(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<u64, StoreError> {
        self.ensure_collection(collection).await?;
        let where_sql = FilterSql::generate(filter.condition_ref(), 1)?;
        let mut params = vec![Value::Object(patch.clone())];
        params.extend(where_sql.params);
        let sql = SqlResult {
            query: format!(
                "UPDATE {} SET doc = doc || $1::jsonb WHERE {}",
                quote_identifier(collection),
                where_sql.query
            ),
            params,
        };
        self.execute(&sql).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.ensure_collection(collection).await?;
        let where_sql = filter.to_where_sql()?;
        let sql = SqlResult {
            query: format!("DELETE FROM {} WHERE {}", quote_identifier(collection), where_sql.query),
            params: where_sql.params,
        };
        self.execute(&sql).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
