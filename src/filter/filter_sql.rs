//! SQL generation for documents stored as a JSONB `doc` column.
//!
//! Every field comparison is wrapped in `COALESCE(.., false)` so that missing
//! fields behave the same way as in the in-memory matcher, including under
//! `NOT`.

use serde_json::Value;

use super::error::FilterError;
use super::filter_where::validate_path;
use super::types::{Condition, FilterOp, FilterOrderInfo, FilterWhereInfo, SqlResult};

pub struct FilterSql {
    param_values: Vec<Value>,
}

impl FilterSql {
    /// Build a WHERE expression (without the `WHERE` keyword) and its bound
    /// parameters. `None` yields `TRUE`.
    pub fn generate(condition: Option<&Condition>, starting_param_index: usize) -> Result<SqlResult, FilterError> {
        let mut sql = Self { param_values: Vec::new() };
        let query = match condition {
            Some(condition) => sql.build(condition, starting_param_index)?,
            None => "TRUE".to_string(),
        };
        Ok(SqlResult { query, params: sql.param_values })
    }

    pub fn order_clause(order: &[FilterOrderInfo]) -> Result<String, FilterError> {
        if order.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(order.len());
        for info in order {
            parts.push(format!("{} {}", json_path(&info.column)?, info.sort.to_sql()));
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }

    fn build(&mut self, condition: &Condition, offset: usize) -> Result<String, FilterError> {
        match condition {
            Condition::And(parts) if parts.is_empty() => Ok("TRUE".to_string()),
            Condition::Or(parts) if parts.is_empty() => Ok("FALSE".to_string()),
            Condition::And(parts) => self.join(parts, " AND ", offset),
            Condition::Or(parts) => self.join(parts, " OR ", offset),
            Condition::Not(inner) => Ok(format!("NOT ({})", self.build(inner, offset)?)),
            Condition::Field(info) => self.build_field(info, offset),
        }
    }

    fn join(&mut self, parts: &[Condition], joiner: &str, offset: usize) -> Result<String, FilterError> {
        let mut sql_parts = Vec::with_capacity(parts.len());
        for part in parts {
            sql_parts.push(format!("({})", self.build(part, offset)?));
        }
        Ok(sql_parts.join(joiner))
    }

    fn build_field(&mut self, info: &FilterWhereInfo, offset: usize) -> Result<String, FilterError> {
        let path = json_path(&info.column)?;
        let expr = match info.operator {
            FilterOp::Eq => return Ok(self.equality(&path, &info.data, offset)),
            FilterOp::Ne => return Ok(format!("NOT {}", self.equality(&path, &info.data, offset))),
            FilterOp::Gt => self.comparison(&path, ">", &info.data, offset),
            FilterOp::Gte => self.comparison(&path, ">=", &info.data, offset),
            FilterOp::Lt => self.comparison(&path, "<", &info.data, offset),
            FilterOp::Lte => self.comparison(&path, "<=", &info.data, offset),
            FilterOp::In | FilterOp::NIn => {
                let values = info.data.as_array().cloned().unwrap_or_default();
                let list = if values.is_empty() {
                    "FALSE".to_string()
                } else {
                    values
                        .iter()
                        .map(|v| self.equality(&path, v, offset))
                        .collect::<Vec<_>>()
                        .join(" OR ")
                };
                return Ok(if info.operator == FilterOp::In {
                    format!("({})", list)
                } else {
                    format!("NOT ({})", list)
                });
            }
            FilterOp::Between => match info.data.as_array().map(Vec::as_slice) {
                Some([low, high]) => format!(
                    "{} AND {}",
                    self.comparison(&path, ">=", low, offset),
                    self.comparison(&path, "<=", high, offset)
                ),
                _ => return Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },
            FilterOp::Exists => {
                let null_check = if info.data.as_bool().unwrap_or(true) { "IS NOT NULL" } else { "IS NULL" };
                return Ok(format!("({} {})", path, null_check));
            }
            FilterOp::Like | FilterOp::ILike => {
                let keyword = if info.operator == FilterOp::Like { "LIKE" } else { "ILIKE" };
                let param = self.param(info.data.clone(), offset);
                format!("({}) {} ({} #>> '{{}}')", text_path(&path), keyword, param)
            }
        };
        Ok(format!("COALESCE({}, false)", expr))
    }

    fn equality(&mut self, path: &str, data: &Value, offset: usize) -> String {
        if data.is_null() {
            return format!("({} IS NULL OR {} = 'null'::jsonb)", path, path);
        }
        let param = self.param(data.clone(), offset);
        if data.is_array() {
            format!("COALESCE({} = {}, false)", path, param)
        } else {
            // Arrays match when they contain the scalar
            format!(
                "COALESCE({} = {} OR (jsonb_typeof({}) = 'array' AND {} @> jsonb_build_array({})), false)",
                path, param, path, path, param
            )
        }
    }

    fn comparison(&mut self, path: &str, op: &str, data: &Value, offset: usize) -> String {
        let param = self.param(data.clone(), offset);
        format!("(jsonb_typeof({}) = jsonb_typeof({}) AND {} {} {})", path, param, path, op, param)
    }

    fn param(&mut self, value: Value, offset: usize) -> String {
        self.param_values.push(value);
        format!("${}::jsonb", offset + self.param_values.len())
    }
}

/// `doc #> '{a,b}'` for a validated dotted path.
pub fn json_path(column: &str) -> Result<String, FilterError> {
    validate_path(column)?;
    Ok(format!("doc #> '{{{}}}'", column.replace('.', ",")))
}

fn text_path(json_path: &str) -> String {
    json_path.replacen("#>", "#>>", 1)
}

/// Quote an identifier for use as a table name.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
