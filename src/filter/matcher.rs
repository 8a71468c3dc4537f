//! In-process evaluation of the filter language over JSON documents. Used by
//! the in-memory store and by relation expansion.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::types::{Condition, FilterOp, FilterOrderInfo, FilterWhereInfo, Projection, SortDirection};

pub type Document = Map<String, Value>;

pub fn matches(doc: &Document, condition: &Condition) -> bool {
    match condition {
        Condition::And(parts) => parts.iter().all(|c| matches(doc, c)),
        Condition::Or(parts) => parts.iter().any(|c| matches(doc, c)),
        Condition::Not(inner) => !matches(doc, inner),
        Condition::Field(info) => matches_field(doc, info),
    }
}

fn matches_field(doc: &Document, info: &FilterWhereInfo) -> bool {
    let actual = lookup(doc, &info.column);
    let data = &info.data;
    match info.operator {
        FilterOp::Eq => equals_or_contains(actual, data),
        FilterOp::Ne => !equals_or_contains(actual, data),
        FilterOp::Gt => compare_with(actual, data, |o| o == Ordering::Greater),
        FilterOp::Gte => compare_with(actual, data, |o| o != Ordering::Less),
        FilterOp::Lt => compare_with(actual, data, |o| o == Ordering::Less),
        FilterOp::Lte => compare_with(actual, data, |o| o != Ordering::Greater),
        FilterOp::In => in_list(actual, data),
        FilterOp::NIn => !in_list(actual, data),
        FilterOp::Between => match data.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                compare_with(actual, low, |o| o != Ordering::Less)
                    && compare_with(actual, high, |o| o != Ordering::Greater)
            }
            _ => false,
        },
        FilterOp::Exists => actual.is_some() == data.as_bool().unwrap_or(true),
        FilterOp::Like | FilterOp::ILike => match (actual.and_then(Value::as_str), data.as_str()) {
            (Some(text), Some(pattern)) => like_match(pattern, text, info.operator == FilterOp::ILike),
            _ => false,
        },
    }
}

/// Resolve a dotted path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn equals_or_contains(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(|item| values_equal(item, expected)),
        Some(value) => values_equal(value, expected),
    }
}

fn in_list(actual: Option<&Value>, data: &Value) -> bool {
    data.as_array()
        .map(|candidates| candidates.iter().any(|c| equals_or_contains(actual, c)))
        .unwrap_or(false)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_with(actual: Option<&Value>, data: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    actual.and_then(|a| compare_values(a, data)).map(accept).unwrap_or(false)
}

/// Ordering between two scalars of the same JSON type; `None` for mixed types.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL `LIKE` semantics: `%` matches any run, `_` matches one character.
fn like_match(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    let (pattern, text): (Vec<char>, Vec<char>) = if case_insensitive {
        (pattern.to_lowercase().chars().collect(), text.to_lowercase().chars().collect())
    } else {
        (pattern.chars().collect(), text.chars().collect())
    };

    // matched[j] is true when pattern[..i] matches text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for &p in &pattern {
        let mut next = vec![false; text.len() + 1];
        if p == '%' {
            let mut seen = false;
            for j in 0..=text.len() {
                seen |= matched[j];
                next[j] = seen;
            }
        } else {
            for j in 1..=text.len() {
                next[j] = matched[j - 1] && (p == '_' || p == text[j - 1]);
            }
        }
        matched = next;
    }
    matched[text.len()]
}

/// Rank used to order values of different JSON types; missing and null sort first.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

pub fn sort_documents(docs: &mut [Document], order: &[FilterOrderInfo]) {
    if order.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for info in order {
            let (left, right) = (lookup(a, &info.column), lookup(b, &info.column));
            let ordering = match (left, right) {
                (Some(l), Some(r)) => compare_values(l, r).unwrap_or_else(|| type_rank(left).cmp(&type_rank(right))),
                _ => type_rank(left).cmp(&type_rank(right)),
            };
            let ordering = match info.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Apply a projection. Inclusion always keeps `_id`.
pub fn project(doc: Document, projection: &Projection) -> Document {
    match projection {
        Projection::All => doc,
        Projection::Include(fields) => {
            let mut out = Document::new();
            if let Some(id) = doc.get("_id") {
                out.insert("_id".to_string(), id.clone());
            }
            for field in fields {
                if let Some(value) = lookup(&doc, field) {
                    insert_path(&mut out, field, value.clone());
                }
            }
            out
        }
        Projection::Exclude(fields) => {
            let mut doc = doc;
            for field in fields {
                remove_path(&mut doc, field);
            }
            doc
        }
    }
}

fn insert_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = doc.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterWhere;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn check(filter: Value, document: Value) -> bool {
        let condition = FilterWhere::parse(&filter).unwrap().unwrap();
        matches(&doc(document), &condition)
    }

    #[test]
    fn equality_and_comparisons() {
        let student = json!({"name": "Ada", "age": 12, "tags": ["math", "art"], "address": {"city": "Oslo"}});
        assert!(check(json!({"name": "Ada"}), student.clone()));
        assert!(check(json!({"age": {"$gte": 12, "$lt": 13.5}}), student.clone()));
        assert!(!check(json!({"age": {"$gt": 12}}), student.clone()));
        assert!(check(json!({"tags": "art"}), student.clone()));
        assert!(check(json!({"address.city": "Oslo"}), student.clone()));
        assert!(check(json!({"age": {"$between": [10, 12]}}), student.clone()));
        assert!(!check(json!({"age": {"$gt": "10"}}), student));
    }

    #[test]
    fn missing_fields() {
        let d = json!({"name": "Ada"});
        assert!(check(json!({"archived": null}), d.clone()));
        assert!(check(json!({"archived": {"$ne": true}}), d.clone()));
        assert!(check(json!({"archived": {"$exists": false}}), d.clone()));
        assert!(!check(json!({"age": {"$lt": 100}}), d.clone()));
        assert!(check(json!({"grade": {"$nin": ["a"]}}), d));
    }

    #[test]
    fn like_patterns() {
        assert!(like_match("Ad%", "Ada Lovelace", false));
        assert!(like_match("%love%", "Ada Lovelace", true));
        assert!(!like_match("%love%", "Ada Lovelace", false));
        assert!(like_match("A_a", "Ada", false));
        assert!(!like_match("A_", "Ada", false));
    }

    #[test]
    fn sorting_puts_missing_first_ascending() {
        let mut docs = vec![doc(json!({"n": 2})), doc(json!({})), doc(json!({"n": 1}))];
        sort_documents(&mut docs, &[FilterOrderInfo { column: "n".into(), sort: SortDirection::Asc }]);
        assert_eq!(docs[0].get("n"), None);
        assert_eq!(docs[1]["n"], json!(1));

        sort_documents(&mut docs, &[FilterOrderInfo { column: "n".into(), sort: SortDirection::Desc }]);
        assert_eq!(docs[0]["n"], json!(2));
    }

    #[test]
    fn projection_keeps_id_and_nested_paths() {
        let d = doc(json!({"_id": "1", "name": "Ada", "age": 12, "address": {"city": "Oslo", "zip": "0150"}}));
        let projected = project(d.clone(), &Projection::Include(vec!["name".into(), "address.city".into()]));
        assert_eq!(Value::Object(projected), json!({"_id": "1", "name": "Ada", "address": {"city": "Oslo"}}));

        let excluded = project(d, &Projection::Exclude(vec!["age".into(), "address.zip".into()]));
        assert_eq!(Value::Object(excluded), json!({"_id": "1", "name": "Ada", "address": {"city": "Oslo"}}));
    }
}
