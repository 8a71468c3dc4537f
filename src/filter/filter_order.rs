use serde_json::Value;

use super::filter_where::validate_path;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts `"name,-created_at"`, `"created_at desc"`, arrays of such strings,
    /// or `{ "created_at": "desc" }`. Entries naming invalid fields are dropped.
    pub fn parse(order: &Value) -> Vec<FilterOrderInfo> {
        match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => arr
                .iter()
                .filter_map(Value::as_str)
                .flat_map(Self::parse_order_string)
                .collect(),
            Value::Object(obj) => obj
                .iter()
                .filter_map(|(k, v)| {
                    let sort = match v.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                        "desc" | "-1" => SortDirection::Desc,
                        _ if v.as_i64() == Some(-1) => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    };
                    Self::checked(k, sort)
                })
                .collect(),
            _ => vec![],
        }
    }

    pub fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(token) = it.next() else { continue };
            let (column, mut sort) = match token.strip_prefix('-') {
                Some(col) => (col, SortDirection::Desc),
                None => (token.strip_prefix('+').unwrap_or(token), SortDirection::Asc),
            };
            if let Some(dir) = it.next() {
                if dir.eq_ignore_ascii_case("desc") {
                    sort = SortDirection::Desc;
                } else if dir.eq_ignore_ascii_case("asc") {
                    sort = SortDirection::Asc;
                }
            }
            out.extend(Self::checked(column, sort));
        }
        out
    }

    fn checked(column: &str, sort: SortDirection) -> Option<FilterOrderInfo> {
        match validate_path(column) {
            Ok(()) => Some(FilterOrderInfo { column: column.to_string(), sort }),
            Err(_) => {
                tracing::warn!("Ignoring sort on invalid field '{}'", column);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(infos: &[FilterOrderInfo]) -> Vec<(&str, SortDirection)> {
        infos.iter().map(|i| (i.column.as_str(), i.sort)).collect()
    }

    #[test]
    fn prefix_minus_means_descending() {
        let infos = FilterOrder::parse(&json!("name,-created_at"));
        assert_eq!(cols(&infos), vec![("name", SortDirection::Asc), ("created_at", SortDirection::Desc)]);
    }

    #[test]
    fn keyword_directions_and_objects() {
        let infos = FilterOrder::parse(&json!(["created_at desc", "name asc"]));
        assert_eq!(cols(&infos), vec![("created_at", SortDirection::Desc), ("name", SortDirection::Asc)]);

        let infos = FilterOrder::parse(&json!({"score": -1}));
        assert_eq!(cols(&infos), vec![("score", SortDirection::Desc)]);
    }

    #[test]
    fn invalid_fields_are_dropped() {
        let infos = FilterOrder::parse(&json!("name,-bad;field,,  "));
        assert_eq!(cols(&infos), vec![("name", SortDirection::Asc)]);
    }
}
