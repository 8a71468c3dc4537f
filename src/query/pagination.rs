use serde::{Deserialize, Serialize};

use crate::config::QueryConfig;
use crate::filter::filter::MAX_ROWS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Non-numeric or out-of-range values fall back to defaults; `limit` is
    /// capped at `max_limit`.
    pub fn resolve(page: Option<&str>, limit: Option<&str>, config: &QueryConfig) -> Self {
        let page = match parse_int(page) {
            Some(p) if p >= 1 => p as u64,
            _ => 1,
        };
        let default_limit = config.default_limit.clamp(1, config.max_limit.max(1));
        let limit = match parse_int(limit) {
            Some(l) if l > 0 => (l as u64).min(config.max_limit.max(1)),
            _ => default_limit,
        };
        // Keep (page - 1) * limit within MAX_ROWS
        let page = page.min(MAX_ROWS / limit + 1);
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total_results: u64) -> u64 {
        total_results.div_ceil(self.limit)
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

/// Paginated list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResultEnvelope<T> {
    pub results: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_results: u64,
}

impl<T> ListResultEnvelope<T> {
    pub fn new(results: Vec<T>, pagination: Pagination, total_results: u64) -> Self {
        Self {
            results,
            page: pagination.page,
            limit: pagination.limit,
            total_pages: pagination.total_pages(total_results),
            total_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(page: Option<&str>, limit: Option<&str>) -> Pagination {
        Pagination::resolve(page, limit, &QueryConfig::default())
    }

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(resolve(None, None), Pagination { page: 1, limit: 25 });
        assert_eq!(resolve(Some("3"), Some("10")), Pagination { page: 3, limit: 10 });
        assert_eq!(resolve(Some("0"), Some("-4")), Pagination { page: 1, limit: 25 });
        assert_eq!(resolve(Some("abc"), Some("ten")), Pagination { page: 1, limit: 25 });
        assert_eq!(resolve(None, Some("5000")), Pagination { page: 1, limit: 100 });
    }

    #[test]
    fn huge_pages_stay_within_bigint() {
        let pagination = resolve(Some("9223372036854775807"), Some("10"));
        assert!(pagination.offset() <= MAX_ROWS);
        assert_eq!(pagination.page, MAX_ROWS / 10 + 1);
        assert!(resolve(Some("99999999999999999999"), None).offset() <= MAX_ROWS);
    }

    #[test]
    fn page_arithmetic() {
        let pagination = resolve(Some("3"), Some("10"));
        assert_eq!(pagination.offset(), 20);
        assert_eq!(pagination.total_pages(23), 3);
        assert_eq!(pagination.total_pages(0), 0);
        assert_eq!(pagination.total_pages(20), 2);
    }
}
