use std::collections::{HashMap, HashSet};

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use super::parse_select;
use crate::filter::{Condition, Document, Filter, FilterOp};
use crate::models::Model;
use crate::observer::ObserverError;

/// One relation to expand, with an optional projection for the related
/// documents and nested expansions inside them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulateSpec {
    pub path: String,
    pub select: Option<String>,
    pub populate: Vec<PopulateSpec>,
}

impl PopulateSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Self::default() }
    }

    /// Parse the `populate` parameter: `class,teacher`, `class.teacher`, or a
    /// JSON object / array of `{ path, select, populate }`.
    pub fn parse(raw: &str) -> Vec<PopulateSpec> {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => merge(Self::from_value(&value)),
                Err(err) => {
                    tracing::warn!("Ignoring malformed populate parameter: {}", err);
                    Vec::new()
                }
            };
        }
        merge(trimmed.split(',').filter_map(|p| Self::from_path(p.trim())).collect())
    }

    fn from_value(value: &Value) -> Vec<PopulateSpec> {
        match value {
            Value::String(paths) => paths.split(',').filter_map(|p| Self::from_path(p.trim())).collect(),
            Value::Array(items) => items.iter().flat_map(Self::from_value).collect(),
            Value::Object(obj) => {
                let Some(mut spec) = obj.get("path").and_then(Value::as_str).and_then(Self::from_path) else {
                    tracing::warn!("Ignoring populate entry without a path");
                    return Vec::new();
                };
                let select = match obj.get("select") {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Array(fields)) => Some(
                        fields.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(","),
                    ),
                    _ => None,
                };
                let nested = obj.get("populate").map(Self::from_value).unwrap_or_default();

                // Options apply to the innermost segment of a dotted path
                let leaf = innermost(&mut spec);
                leaf.select = select;
                leaf.populate.extend(nested);
                vec![spec]
            }
            _ => Vec::new(),
        }
    }

    fn from_path(path: &str) -> Option<PopulateSpec> {
        let mut segments = path.split('.').map(str::trim).filter(|s| !s.is_empty()).rev();
        let mut spec = PopulateSpec::new(segments.next()?);
        for segment in segments {
            spec = PopulateSpec { path: segment.to_string(), select: None, populate: vec![spec] };
        }
        Some(spec)
    }
}

fn innermost(spec: &mut PopulateSpec) -> &mut PopulateSpec {
    if spec.populate.is_empty() {
        spec
    } else {
        innermost(&mut spec.populate[0])
    }
}

/// Combine specs that share a path so each relation is loaded once.
fn merge(specs: Vec<PopulateSpec>) -> Vec<PopulateSpec> {
    let mut merged: Vec<PopulateSpec> = Vec::new();
    for spec in specs {
        match merged.iter_mut().find(|m| m.path == spec.path) {
            Some(existing) => {
                if existing.select.is_none() {
                    existing.select = spec.select;
                }
                existing.populate.extend(spec.populate);
                existing.populate = merge(std::mem::take(&mut existing.populate));
            }
            None => merged.push(spec),
        }
    }
    merged
}

/// Replace relation ids in `documents` with the referenced documents. Related
/// documents are loaded through the related model, so they are scoped to the
/// current tenant like any other read. Missing references become `null`
/// (single) or are dropped (arrays); paths that are not declared relations are
/// left alone.
pub fn populate<'a>(
    model: &'a Model,
    documents: &'a mut [Document],
    specs: &'a [PopulateSpec],
) -> BoxFuture<'a, Result<(), ObserverError>> {
    async move {
        for spec in specs {
            let Some(target_name) = model.definition().relation_target(&spec.path) else {
                tracing::debug!("'{}' is not a relation of '{}'; skipping populate", spec.path, model.name());
                continue;
            };
            let target = match model.registry().model(target_name) {
                Ok(target) => target,
                Err(err) => {
                    tracing::warn!("Cannot populate '{}' on '{}': {}", spec.path, model.name(), err);
                    continue;
                }
            };

            let ids = referenced_ids(documents, &spec.path);
            if ids.is_empty() {
                continue;
            }

            let mut filter = Filter::new().condition(Some(Condition::field(
                "_id",
                FilterOp::In,
                Value::Array(ids.into_iter().map(Value::String).collect()),
            )));
            if let Some(select) = &spec.select {
                filter = filter.select(parse_select(select))?;
            }

            let mut related = target.find(filter).await?;
            populate(&target, &mut related, &spec.populate).await?;

            let by_id: HashMap<String, Document> = related
                .into_iter()
                .filter_map(|d| d.get("_id").and_then(Value::as_str).map(str::to_string).map(|id| (id, d)))
                .collect();

            for document in documents.iter_mut() {
                if let Some(reference) = document.get_mut(&spec.path) {
                    replace_reference(reference, &by_id);
                }
            }
        }
        Ok(())
    }
    .boxed()
}

fn referenced_ids(documents: &[Document], path: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut push = |id: &str| {
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    };
    for document in documents {
        match document.get(path) {
            Some(Value::String(id)) => push(id.as_str()),
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).for_each(&mut push),
            _ => {}
        }
    }
    ids
}

fn replace_reference(reference: &mut Value, related: &HashMap<String, Document>) {
    match reference {
        Value::String(id) => {
            *reference = related.get(id.as_str()).cloned().map(Value::Object).unwrap_or(Value::Null);
        }
        Value::Array(items) => {
            let resolved = items
                .iter()
                .filter_map(|item| item.as_str().and_then(|id| related.get(id)).cloned().map(Value::Object))
                .collect();
            *items = resolved;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_and_nesting() {
        let specs = PopulateSpec::parse("class, class.teacher ,branch");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].path, "class");
        assert_eq!(specs[0].populate, vec![PopulateSpec::new("teacher")]);
        assert_eq!(specs[1], PopulateSpec::new("branch"));
    }

    #[test]
    fn parses_json_specs() {
        let specs = PopulateSpec::parse(r#"[{"path":"class","select":"name","populate":{"path":"teacher"}}]"#);
        assert_eq!(
            specs,
            vec![PopulateSpec {
                path: "class".into(),
                select: Some("name".into()),
                populate: vec![PopulateSpec::new("teacher")],
            }]
        );
        assert!(PopulateSpec::parse("[{broken").is_empty());
    }

    #[test]
    fn replaces_scalar_and_array_references() {
        let mut related = HashMap::new();
        related.insert("a".to_string(), serde_json::json!({"_id": "a"}).as_object().cloned().unwrap());

        let mut single = Value::String("missing".into());
        replace_reference(&mut single, &related);
        assert_eq!(single, Value::Null);

        let mut many = serde_json::json!(["a", "missing"]);
        replace_reference(&mut many, &related);
        assert_eq!(many, serde_json::json!([{"_id": "a"}]));
    }
}
