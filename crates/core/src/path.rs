//! Route paths as seen by the gates.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A navigation path reduced to what routing decisions look at.
///
/// Query strings and fragments are dropped and a trailing slash is removed,
/// so `/orders/`, `/orders?page=2` and `/orders` are the same path. The root
/// path is always `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePath(String);

impl RoutePath {
    /// The root path (`/`).
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Strict constructor for configured paths and prefixes.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        if !raw.starts_with('/') {
            return Err(DomainError::invalid_path(format!("'{raw}' must start with '/'")));
        }
        if raw.contains(['?', '#']) {
            return Err(DomainError::invalid_path(format!(
                "'{raw}' must not contain a query or fragment"
            )));
        }
        if raw.trim_end_matches('/').contains("//") {
            return Err(DomainError::invalid_path(format!("'{raw}' has an empty segment")));
        }
        Ok(Self::normalize(raw))
    }

    /// Lenient normalization for paths coming from navigation.
    ///
    /// Never fails: anything unusable collapses to `/`.
    pub fn normalize(raw: &str) -> Self {
        let end = raw.find(['?', '#']).unwrap_or(raw.len());
        let trimmed = raw[..end].trim().trim_end_matches('/');
        if trimmed.is_empty() {
            Self::root()
        } else if trimmed.starts_with('/') {
            Self(trimmed.to_string())
        } else {
            Self(format!("/{trimmed}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Whether this path equals `prefix` or is a sub-path of it.
    ///
    /// Matching is segment-aware: `/orders-archive` is not within `/orders`.
    pub fn is_within(&self, prefix: &RoutePath) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.0
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

impl core::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoutePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoutePath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoutePath> for String {
    fn from(value: RoutePath) -> Self {
        value.0
    }
}
