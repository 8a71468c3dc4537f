use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Sanitized tenant identifier derived from a customer slug.
///
/// Handles are immutable and cheap to clone; the same handle is shared by every
/// continuation of the logical operation that established it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantHandle(Arc<str>);

impl TenantHandle {
    /// Build a handle from a raw slug. Returns `None` for an empty slug, which
    /// callers treat as "no tenant".
    pub fn from_slug(slug: &str) -> Option<Self> {
        let sanitized = sanitize_slug(slug);
        if sanitized.is_empty() {
            None
        } else {
            Some(Self(Arc::from(sanitized)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TenantHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Lower-case the slug and replace path-unsafe characters (`/ . " $`) and
/// whitespace with `_`.
pub fn sanitize_slug(slug: &str) -> String {
    slug.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            '/' | '.' | '"' | '$' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_mixed_case_and_unsafe_characters() {
        assert_eq!(sanitize_slug("Acme School!"), "acme_school!");
        assert_eq!(sanitize_slug("St. Mary's/North"), "st__mary's_north");
        assert_eq!(sanitize_slug("a\"b$c d\te"), "a_b_c_d_e");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for slug in ["Acme School!", "../../etc", "  X.Y  ", "ÄÖ/ü", "$where", "plain"] {
            let once = sanitize_slug(slug);
            assert_eq!(sanitize_slug(&once), once, "not idempotent for {:?}", slug);
        }
    }

    #[test]
    fn empty_slug_is_no_tenant() {
        assert!(TenantHandle::from_slug("").is_none());
        assert_eq!(TenantHandle::from_slug("Acme").unwrap().as_str(), "acme");
    }

    #[test]
    fn handle_serializes_as_plain_string() {
        let handle = TenantHandle::from_slug("Acme").unwrap();
        assert_eq!(serde_json::to_value(&handle).unwrap(), serde_json::json!("acme"));
    }
}
