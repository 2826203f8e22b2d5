//! Gate configuration: public paths and the route permission table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storegate_auth::{ExpiryPolicy, RoutePermissionMatrix, RouteRule};
use storegate_core::{DomainError, RoutePath};

use crate::edge::EdgeGate;
use crate::{HOME_PATH, LOGIN_PATH, UNAUTHORIZED_PATH};

/// Paths the edge gate always lets through.
pub const DEFAULT_PUBLIC_PATHS: [&str; 4] =
    [HOME_PATH, LOGIN_PATH, "/register", "/forgot-password"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read gate config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse gate config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid gate config: {0}")]
    Invalid(#[from] DomainError),
}

/// One table drives both gates: a path is protected at the edge exactly when
/// the permission matrix has a rule for it.
///
/// ```json
/// {
///   "public_paths": ["/", "/login"],
///   "routes": [{ "prefix": "/reports", "roles": ["admin"] }],
///   "expiry_leeway_secs": 30
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<RoutePath>,

    #[serde(default = "default_routes")]
    pub routes: Vec<RouteRule>,

    #[serde(default)]
    pub expiry_leeway_secs: i64,
}

fn default_public_paths() -> Vec<RoutePath> {
    DEFAULT_PUBLIC_PATHS
        .iter()
        .map(|p| RoutePath::normalize(p))
        .collect()
}

fn default_routes() -> Vec<RouteRule> {
    RoutePermissionMatrix::storefront().rules().to_vec()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            public_paths: default_public_paths(),
            routes: default_routes(),
            expiry_leeway_secs: 0,
        }
    }
}

impl GateConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Loads the file named by `STOREGATE_ROUTES`, or the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os("STOREGATE_ROUTES") {
            Some(path) => Self::from_path(path),
            None => {
                tracing::debug!("STOREGATE_ROUTES not set; using the storefront route table");
                Ok(Self::default())
            }
        }
    }

    /// The redirect targets must stay reachable, or a denied visitor would be
    /// redirected forever.
    pub fn validate(&self) -> Result<RoutePermissionMatrix, ConfigError> {
        let matrix = RoutePermissionMatrix::new(self.routes.clone())?;

        for target in [LOGIN_PATH, UNAUTHORIZED_PATH, HOME_PATH] {
            if let Some(rule) = matrix.resolve(target).rule() {
                return Err(DomainError::validation(format!(
                    "redirect target '{target}' is governed by route '{}'",
                    rule.prefix
                ))
                .into());
            }
        }

        self.leeway()?;

        for public in &self.public_paths {
            if matrix.is_protected(public) {
                tracing::warn!(
                    %public,
                    "public path is also a protected route; public wins at the edge"
                );
            }
        }

        Ok(matrix)
    }

    pub fn matrix(&self) -> Result<Arc<RoutePermissionMatrix>, ConfigError> {
        self.validate().map(Arc::new)
    }

    pub fn expiry_policy(&self) -> Result<ExpiryPolicy, ConfigError> {
        self.leeway().map(ExpiryPolicy::with_leeway)
    }

    pub fn edge_gate(&self) -> Result<EdgeGate, ConfigError> {
        Ok(EdgeGate::new(self.public_paths.iter().cloned(), self.matrix()?)
            .with_policy(self.expiry_policy()?))
    }

    fn leeway(&self) -> Result<Duration, ConfigError> {
        if self.expiry_leeway_secs < 0 {
            return Err(DomainError::validation("expiry_leeway_secs must not be negative").into());
        }
        Duration::try_seconds(self.expiry_leeway_secs).ok_or_else(|| {
            DomainError::validation(format!(
                "expiry_leeway_secs {} is out of range",
                self.expiry_leeway_secs
            ))
            .into()
        })
    }
}
