/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Model operations routed through the observer pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Count,
    Create,
    Update,
    Delete,
}

