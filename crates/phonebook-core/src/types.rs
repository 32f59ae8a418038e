use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Identifier handed to search clients: `g-<pk>` for canonical groups, `i-<pk>` for items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalRef {
    Group(i64),
    Item(i64),
}

impl ExternalRef {
    /// ## Summary
    /// Parses a search scope the way endpoints send it.
    ///
    /// Accepts `g-<pk>` as well as a bare `<pk>`. Anything else yields `None`,
    /// which callers treat as an unknown scope rather than an error.
    #[must_use]
    pub fn parse_group_scope(value: &str) -> Option<i64> {
        let trimmed = value.trim();
        let raw = trimmed.strip_prefix("g-").unwrap_or(trimmed);
        raw.parse().ok()
    }
}

impl fmt::Display for ExternalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(id) => write!(f, "g-{id}"),
            Self::Item(id) => write!(f, "i-{id}"),
        }
    }
}

impl FromStr for ExternalRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_id = |raw: &str| {
            raw.parse::<i64>()
                .map_err(|e| CoreError::ParseError(format!("invalid external id {s:?}: {e}")))
        };

        if let Some(raw) = s.strip_prefix("g-") {
            Ok(Self::Group(parse_id(raw)?))
        } else if let Some(raw) = s.strip_prefix("i-") {
            Ok(Self::Item(parse_id(raw)?))
        } else {
            Err(CoreError::ParseError(format!("invalid external id {s:?}")))
        }
    }
}
