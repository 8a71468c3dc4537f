//! Generic list-query engine ("advanced results").
//!
//! Turns loosely typed list parameters into a validated [`Filter`], runs the
//! count and the page fetch through the model's scoped pipeline and expands
//! relations. The tenant constraint is applied inside the pipeline, so nothing
//! here sees or handles tenants.

pub mod pagination;
pub mod populate;
pub mod spec;

pub use pagination::{ListResultEnvelope, Pagination};
pub use populate::{populate, PopulateSpec};
pub use spec::ListQuerySpec;

use serde_json::{json, Map, Value};

use crate::config::{config, QueryConfig};
use crate::filter::filter_where::validate_path;
use crate::filter::{Document, Filter, FilterOrder};
use crate::models::Model;
use crate::observer::ObserverError;

impl Model {
    /// Paginated, filtered, sorted, projected and populated listing using the
    /// process configuration.
    pub async fn advanced_results(&self, spec: &ListQuerySpec) -> Result<ListResultEnvelope<Document>, ObserverError> {
        self.advanced_results_with(spec, &config().query).await
    }

    pub async fn advanced_results_with(
        &self,
        spec: &ListQuerySpec,
        config: &QueryConfig,
    ) -> Result<ListResultEnvelope<Document>, ObserverError> {
        let pagination = Pagination::resolve(spec.page.as_deref(), spec.limit.as_deref(), config);
        let filter = build_filter(spec, config)?;

        if config.debug_logging {
            tracing::debug!(model = self.name(), ?pagination, ?filter, "advanced results");
        }

        let page_filter = filter.clone().paginate(Some(pagination.limit), pagination.offset());

        // Both run in this task and therefore under the same tenant binding
        let (total_results, mut results) = futures::try_join!(self.count(filter), self.find(page_filter))?;

        if let Some(raw) = spec.populate.as_deref() {
            let specs = PopulateSpec::parse(raw);
            populate(self, &mut results, &specs).await?;
        }

        Ok(ListResultEnvelope::new(results, pagination, total_results))
    }
}

/// Build the filter for a list request: conditions, sort and projection.
/// Paging is applied separately.
pub fn build_filter(spec: &ListQuerySpec, config: &QueryConfig) -> Result<Filter, ObserverError> {
    let conditions = build_conditions(spec);
    let mut filter = Filter::new().where_value(&Value::Object(conditions))?;

    let mut order = spec
        .sort
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| FilterOrder::parse(&Value::String(s.to_string())))
        .unwrap_or_default();
    if order.is_empty() {
        order = FilterOrder::parse(&Value::String(config.default_sort.clone()));
    }
    filter = filter.order(order);

    if let Some(select) = spec.select.as_deref() {
        filter = filter.select(parse_select(select))?;
    }
    Ok(filter)
}

/// Client query, then flags, then server overrides; later sources replace
/// earlier ones key by key.
fn build_conditions(spec: &ListQuerySpec) -> Map<String, Value> {
    let mut conditions = match spec.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        None => Map::new(),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                tracing::warn!("Ignoring query parameter that is not a JSON object: {}", other);
                Map::new()
            }
            Err(err) => {
                tracing::warn!("Ignoring malformed query parameter: {}", err);
                Map::new()
            }
        },
    };

    if let Some(raw) = spec.is_active.as_deref() {
        match parse_flag(raw) {
            Some(active) => {
                conditions.insert("is_active".to_string(), Value::Bool(active));
            }
            None => tracing::warn!("Ignoring is_active={:?}", raw),
        }
    }

    if let Some(raw) = spec.archived.as_deref() {
        match parse_flag(raw) {
            Some(true) => {
                conditions.insert("archived".to_string(), Value::Bool(true));
            }
            // Documents without the field count as not archived
            Some(false) => {
                conditions.insert("archived".to_string(), json!({"$ne": true}));
            }
            None => tracing::warn!("Ignoring archived={:?}", raw),
        }
    }

    for (key, value) in [("branch", &spec.branch), ("role", &spec.role)] {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            conditions.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    for (key, value) in &spec.overrides {
        conditions.insert(key.clone(), value.clone());
    }

    conditions
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Split a `select` parameter on commas and whitespace, dropping invalid
/// field names.
pub fn parse_select(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty())
        .filter(|field| {
            let valid = validate_path(field.trim_start_matches('-')).is_ok();
            if !valid {
                tracing::warn!("Ignoring select of invalid field '{}'", field);
            }
            valid
        })
        .map(str::to_string)
        .collect()
}
