//! Errors of the pure layers.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejected input: a bad id, a bad route path, or a config value that fails
/// a check.
///
/// IO and network failures have their own errors in the crates that perform
/// them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Not absolute, or carries a query, fragment or empty segment.
    #[error("invalid route path: {0}")]
    InvalidPath(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }
}
