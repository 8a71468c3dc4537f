use serde::Deserialize;
use serde_json::Value;

use crate::filter::Document;

/// Client-facing list parameters, kept as raw strings so that malformed
/// values are normalised rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuerySpec {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub select: Option<String>,
    pub populate: Option<String>,
    /// JSON object string in the filter language
    pub query: Option<String>,
    pub is_active: Option<String>,
    pub archived: Option<String>,
    pub branch: Option<String>,
    pub role: Option<String>,

    /// Server-side conditions; each key replaces whatever the client sent
    /// for the same key. Never read from the request.
    #[serde(skip)]
    pub overrides: Document,
}

impl ListQuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: impl ToString) -> Self {
        self.page = Some(page.to_string());
        self
    }

    pub fn limit(mut self, limit: impl ToString) -> Self {
        self.limit = Some(limit.to_string());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn populate(mut self, populate: impl Into<String>) -> Self {
        self.populate = Some(populate.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }
}
