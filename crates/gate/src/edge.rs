use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use storegate_auth::{ExpiryPolicy, RoutePermissionMatrix};
use storegate_core::RoutePath;
use storegate_session::{TokenStore, load_token};

use crate::HOME_PATH;
use crate::config::DEFAULT_PUBLIC_PATHS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum EdgeVerdict {
    Allow,
    Deny { redirect_to: RoutePath },
}

impl EdgeVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, EdgeVerdict::Allow)
    }
}

/// Pre-delivery check, run before any page code.
///
/// Sees only the requested path and the durable token: no identity, no
/// session state, so it cannot race initialization. It never mutates
/// anything; a stale token is left for the in-app gate to tear down.
#[derive(Debug, Clone)]
pub struct EdgeGate {
    public_paths: BTreeSet<RoutePath>,
    matrix: Arc<RoutePermissionMatrix>,
    policy: ExpiryPolicy,
}

impl EdgeGate {
    pub fn new(
        public_paths: impl IntoIterator<Item = RoutePath>,
        matrix: Arc<RoutePermissionMatrix>,
    ) -> Self {
        Self {
            public_paths: public_paths.into_iter().collect(),
            matrix,
            policy: ExpiryPolicy::new(),
        }
    }

    /// Default public paths over the storefront route table.
    pub fn storefront() -> Self {
        Self::new(
            DEFAULT_PUBLIC_PATHS.iter().map(|p| RoutePath::normalize(p)),
            Arc::new(RoutePermissionMatrix::storefront()),
        )
    }

    pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_public(&self, path: &RoutePath) -> bool {
        self.public_paths.contains(path)
    }

    /// Decide for `path` given the durable token (if any).
    ///
    /// - exact public path → allow
    /// - protected path → allow only with a present, unexpired token
    /// - anything else → allow
    pub fn evaluate(&self, path: &str, token: Option<&str>, now: DateTime<Utc>) -> EdgeVerdict {
        let path = RoutePath::normalize(path);

        if self.is_public(&path) {
            tracing::trace!(%path, "edge: public path");
            return EdgeVerdict::Allow;
        }

        if !self.matrix.is_protected(&path) {
            tracing::trace!(%path, "edge: unlisted path");
            return EdgeVerdict::Allow;
        }

        if self.policy.is_present_and_valid(token, now) {
            EdgeVerdict::Allow
        } else {
            tracing::info!(%path, token_present = token.is_some(), "edge: denying protected path");
            EdgeVerdict::Deny {
                redirect_to: RoutePath::normalize(HOME_PATH),
            }
        }
    }

    /// [`evaluate`](Self::evaluate) with the token read from the durable store.
    pub fn check(&self, path: &str, durable: &dyn TokenStore, now: DateTime<Utc>) -> EdgeVerdict {
        let token = load_token(durable);
        self.evaluate(path, token.as_deref(), now)
    }
}
