use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{Condition, FilterOp};

const MAX_DEPTH: usize = 8;

pub struct FilterWhere;

impl FilterWhere {
    /// Parse a JSON filter object into a condition tree. `null` and `{}` mean
    /// "no constraint" and yield `None`.
    pub fn parse(where_data: &Value) -> Result<Option<Condition>, FilterError> {
        match where_data {
            Value::Null => Ok(None),
            Value::Object(obj) => Ok(Self::collapse(Self::parse_object(obj, 0)?)),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    /// Rewrite bare operator keys (`{"age": {"gte": 5}}`) into their `$` form.
    /// Only objects whose keys are all operator names are touched, so nested
    /// document values with ordinary keys pass through unchanged.
    pub fn normalize_operators(where_data: Value) -> Value {
        match where_data {
            Value::Object(obj) => Value::Object(
                obj.into_iter()
                    .map(|(key, value)| {
                        if key.starts_with('$') {
                            let value = match value {
                                Value::Array(items) => {
                                    Value::Array(items.into_iter().map(Self::normalize_operators).collect())
                                }
                                other => Self::normalize_operators(other),
                            };
                            (key, value)
                        } else {
                            (key, Self::normalize_field_value(value))
                        }
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn normalize_field_value(value: Value) -> Value {
        match value {
            Value::Object(obj) if Self::is_operator_object(&obj) => Value::Object(
                obj.into_iter()
                    .map(|(key, value)| {
                        let key = if key.starts_with('$') { key } else { format!("${}", key) };
                        (key, value)
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn is_operator_object(obj: &Map<String, Value>) -> bool {
        !obj.is_empty() && obj.keys().all(|k| FilterOp::from_key(k).is_some())
    }

    fn collapse(mut conditions: Vec<Condition>) -> Option<Condition> {
        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Condition::And(conditions)),
        }
    }

    fn parse_object(obj: &Map<String, Value>, depth: usize) -> Result<Vec<Condition>, FilterError> {
        if depth > MAX_DEPTH {
            return Err(FilterError::TooDeep(MAX_DEPTH));
        }
        let mut conditions = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            if key.starts_with('$') {
                conditions.push(Self::parse_logical_operator(key, value, depth)?);
            } else {
                validate_path(key)?;
                conditions.extend(Self::parse_field_condition(key, value)?);
            }
        }
        Ok(conditions)
    }

    fn parse_logical_operator(op: &str, value: &Value, depth: usize) -> Result<Condition, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut branches = Vec::with_capacity(arr.len());
                for v in arr {
                    let obj = v.as_object().ok_or_else(|| {
                        FilterError::InvalidOperatorData(format!("{} entries must be objects", op))
                    })?;
                    let parts = Self::parse_object(obj, depth + 1)?;
                    branches.push(Self::collapse(parts).unwrap_or(Condition::And(vec![])));
                }
                Ok(if op == "$and" { Condition::And(branches) } else { Condition::Or(branches) })
            }
            "$not" => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$not requires object".to_string()))?;
                let inner = Self::collapse(Self::parse_object(obj, depth + 1)?).unwrap_or(Condition::And(vec![]));
                Ok(Condition::Not(Box::new(inner)))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<Condition>, FilterError> {
        match value {
            Value::Object(obj) if obj.keys().any(|k| k.starts_with('$')) => {
                let mut out = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = FilterOp::from_key(op_key)
                        .filter(|_| op_key.starts_with('$'))
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    Self::validate_operand(operator, op_val)?;
                    out.push(Condition::field(field, operator, op_val.clone()));
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            other => Ok(vec![Condition::field(field, FilterOp::Eq, other.clone())]),
        }
    }

    fn validate_operand(operator: FilterOp, data: &Value) -> Result<(), FilterError> {
        match operator {
            FilterOp::In | FilterOp::NIn if !data.is_array() => Err(FilterError::InvalidOperatorData(format!(
                "{} requires array",
                operator.as_str()
            ))),
            FilterOp::Between => match data.as_array() {
                Some(values) if values.len() == 2 => Ok(()),
                _ => Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },
            FilterOp::Exists if !data.is_boolean() => {
                Err(FilterError::InvalidOperatorData("$exists requires boolean".to_string()))
            }
            FilterOp::Like | FilterOp::ILike if !data.is_string() => Err(FilterError::InvalidOperatorData(format!(
                "{} requires string pattern",
                operator.as_str()
            ))),
            _ => Ok(()),
        }
    }
}

/// Field paths are dot-separated segments of `[A-Za-z0-9_]`.
pub fn validate_path(path: &str) -> Result<(), FilterError> {
    let valid = !path.is_empty()
        && path
            .split('.')
            .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if valid {
        Ok(())
    } else {
        Err(FilterError::InvalidField(path.to_string()))
    }
}
