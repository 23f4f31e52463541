//! Search hint data structure.

use serde::{Deserialize, Serialize};

/// A previously accepted search query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct SearchHint {
    /// Query text, unique
    pub text: String,

    /// Insert time in milliseconds since the Unix epoch
    pub time: i64,
}

/// Normalize raw search input: trimmed, `None` when blank.
pub fn normalize_query(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}
