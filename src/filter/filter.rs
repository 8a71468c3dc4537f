use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_sql::{quote_identifier, FilterSql};
use super::filter_where::{validate_path, FilterWhere};
use super::types::{Condition, FilterData, FilterOrderInfo, Projection, SqlResult};

/// Largest LIMIT or OFFSET a store is asked for; Postgres takes a `bigint`.
pub const MAX_ROWS: u64 = i64::MAX as u64;

/// Validated query shape handed to a document store: projection, WHERE tree,
/// ordering and paging. Carries no collection name; the target collection is
/// resolved separately by the scoping observer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    select: Projection,
    where_clause: Option<Condition>,
    order: Vec<FilterOrderInfo>,
    limit: Option<u64>,
    offset: u64,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a wire payload, validating every part.
    pub fn assign(data: FilterData) -> Result<Self, FilterError> {
        let mut filter = Self::new();
        if let Some(select) = data.select {
            filter = filter.select(select)?;
        }
        if let Some(where_clause) = data.where_clause {
            filter = filter.where_value(&where_clause)?;
        }
        if let Some(order) = data.order {
            filter = filter.order(FilterOrder::parse(&order));
        }
        if data.limit.is_some() || data.offset.is_some() {
            filter = filter.paginate(data.limit, data.offset.unwrap_or(0));
        }
        Ok(filter)
    }

    /// Inclusion projection from field names; `-field` entries make it an
    /// exclusion projection instead.
    pub fn select(self, columns: Vec<String>) -> Result<Self, FilterError> {
        let (exclude, include): (Vec<String>, Vec<String>) =
            columns.into_iter().filter(|c| c.as_str() != "*").partition(|c| c.starts_with('-'));
        let exclude: Vec<String> = exclude.into_iter().map(|c| c[1..].to_string()).collect();
        for column in include.iter().chain(exclude.iter()) {
            validate_path(column)?;
        }
        let projection = if !include.is_empty() {
            Projection::Include(include)
        } else if !exclude.is_empty() {
            Projection::Exclude(exclude)
        } else {
            Projection::All
        };
        Ok(self.projection(projection))
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.select = projection;
        self
    }

    pub fn where_value(self, conditions: &Value) -> Result<Self, FilterError> {
        let normalized = FilterWhere::normalize_operators(conditions.clone());
        Ok(self.condition(FilterWhere::parse(&normalized)?))
    }

    pub fn condition(mut self, condition: Option<Condition>) -> Self {
        self.where_clause = condition;
        self
    }

    /// AND an additional constraint onto whatever the caller supplied. The
    /// caller's tree is kept intact as one conjunct, so nothing inside it can
    /// widen the added constraint.
    pub fn restrict(&mut self, constraint: Condition) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => Condition::And(vec![existing, constraint]),
            None => constraint,
        });
    }

    pub fn order(mut self, order: Vec<FilterOrderInfo>) -> Self {
        self.order = order;
        self
    }

    /// Both values are capped at [`MAX_ROWS`].
    pub fn paginate(mut self, limit: Option<u64>, offset: u64) -> Self {
        self.limit = limit.map(|l| l.min(MAX_ROWS));
        self.offset = offset.min(MAX_ROWS);
        self
    }

    /// Same WHERE clause with projection, ordering and paging removed, for counts.
    pub fn count_only(&self) -> Self {
        Self { where_clause: self.where_clause.clone(), ..Self::default() }
    }

    pub fn projection_ref(&self) -> &Projection {
        &self.select
    }

    pub fn condition_ref(&self) -> Option<&Condition> {
        self.where_clause.as_ref()
    }

    pub fn order_ref(&self) -> &[FilterOrderInfo] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> u64 {
        self.offset
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        FilterSql::generate(self.where_clause.as_ref(), 0)
    }

    pub fn to_sql(&self, table_name: &str) -> Result<SqlResult, FilterError> {
        validate_table_name(table_name)?;
        let where_result = self.to_where_sql()?;
        let order_clause = FilterSql::order_clause(&self.order)?;
        let limit_clause = match self.limit {
            Some(limit) => format!("LIMIT {} OFFSET {}", limit, self.offset),
            None if self.offset > 0 => format!("OFFSET {}", self.offset),
            None => String::new(),
        };

        let query = [
            "SELECT doc".to_string(),
            format!("FROM {}", quote_identifier(table_name)),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_count_sql(&self, table_name: &str) -> Result<SqlResult, FilterError> {
        validate_table_name(table_name)?;
        let where_result = self.to_where_sql()?;
        let query = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE {}",
            quote_identifier(table_name),
            where_result.query
        );
        Ok(SqlResult { query, params: where_result.params })
    }
}

/// Collection names may carry a sanitized tenant suffix, so anything printable
/// is accepted; quoting takes care of the rest.
pub fn validate_table_name(name: &str) -> Result<(), FilterError> {
    if name.is_empty() || name.len() > 63 || name.chars().any(|c| c.is_control()) {
        return Err(FilterError::InvalidCollection(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assign_builds_every_part() {
        let filter = Filter::assign(FilterData {
            select: Some(vec!["name".into(), "age".into()]),
            where_clause: Some(json!({"age": {"gte": 10}})),
            order: Some(json!("-age")),
            limit: Some(5),
            offset: Some(10),
        })
        .unwrap();

        assert_eq!(filter.projection_ref(), &Projection::Include(vec!["name".into(), "age".into()]));
        assert!(filter.condition_ref().is_some());
        assert_eq!(filter.order_ref().len(), 1);
        assert_eq!((filter.limit_value(), filter.offset_value()), (Some(5), 10));
    }

    #[test]
    fn paging_is_capped_to_bigint() {
        let filter = Filter::new().paginate(Some(u64::MAX), u64::MAX);
        assert_eq!((filter.limit_value(), filter.offset_value()), (Some(MAX_ROWS), MAX_ROWS));
        let sql = filter.to_sql("students").unwrap();
        assert!(sql.query.ends_with("LIMIT 9223372036854775807 OFFSET 9223372036854775807"));
    }

    #[test]
    fn exclusion_projection() {
        let filter = Filter::new().select(vec!["-secret".into()]).unwrap();
        assert_eq!(filter.projection_ref(), &Projection::Exclude(vec!["secret".into()]));
    }

    #[test]
    fn restrict_wraps_existing_condition() {
        let mut filter = Filter::new().where_value(&json!({"$or": [{"a": 1}, {"b": 2}]})).unwrap();
        filter.restrict(Condition::eq("customer", "acme"));
        match filter.condition_ref().unwrap() {
            Condition::And(parts) => {
                assert!(matches!(parts[0], Condition::Or(_)));
                assert_eq!(parts[1], Condition::eq("customer", "acme"));
            }
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn sql_statements() {
        let filter = Filter::new()
            .where_value(&json!({"status": "draft"}))
            .unwrap()
            .order(FilterOrder::parse(&json!("name")))
            .paginate(Some(10), 20);

        let select = filter.to_sql("students_acme").unwrap();
        assert!(select.query.starts_with("SELECT doc FROM \"students_acme\" WHERE "), "{}", select.query);
        assert!(select.query.ends_with("ORDER BY doc #> '{name}' ASC NULLS FIRST LIMIT 10 OFFSET 20"), "{}", select.query);

        let count = filter.count_only().to_count_sql("students_acme").unwrap();
        assert!(count.query.starts_with("SELECT COUNT(*) AS count FROM \"students_acme\" WHERE "));
        assert_eq!(count.params, vec![json!("draft")]);
    }

    #[test]
    fn rejects_empty_table_name() {
        assert!(Filter::new().to_sql("").is_err());
    }
}
