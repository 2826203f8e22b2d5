//! Backend collaborator: "who am I", login and logout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storegate_auth::Identity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("credentials rejected ({0})")]
    Rejected(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Successful login exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(alias = "user")]
    pub identity: Identity,
}

/// Network boundary of the session.
///
/// Implementations must not touch session state; the session decides what
/// a result means.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Resolve the identity behind a bearer token.
    async fn fetch_identity(&self, token: &str) -> Result<Identity, FetchError>;

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, FetchError>;

    /// Tell the backend the token is no longer in use.
    async fn logout(&self, token: &str) -> Result<(), FetchError>;
}
