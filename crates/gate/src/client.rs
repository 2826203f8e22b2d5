//! In-app route gate.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use storegate_auth::{AuthzError, ExpiryPolicy, Role, RoutePermissionMatrix, authorize};
use storegate_core::RoutePath;
use storegate_session::{SessionState, SessionStore, TokenStore, clear_session, load_token};

use crate::navigation::Navigator;
use crate::{LOGIN_PATH, UNAUTHORIZED_PATH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Durable token missing, unreadable or expired.
    InvalidToken,
    /// Session settled without a signed-in user.
    NotAuthenticated,
    /// Signed in, but none of the route's roles.
    MissingRole { required: Vec<Role> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ClientDecision {
    Proceed,
    /// Identity still loading; decide again once the session settles.
    Defer,
    Redirect { to: RoutePath, reason: DenyReason },
}

// What an evaluation depended on; an unchanged observation needs no rerun.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observation {
    path: RoutePath,
    is_loading: bool,
    is_authenticated: bool,
}

impl Observation {
    fn new(path: &RoutePath, state: &SessionState) -> Self {
        Self {
            path: path.clone(),
            is_loading: state.is_loading(),
            is_authenticated: state.is_authenticated(),
        }
    }
}

/// Role-aware gate running inside the mounted app.
///
/// Failing the token or authentication check tears the session down and
/// sends the user to `/login`; a role mismatch sends them to `/unauthorized`.
/// While the session is loading no role-based decision is made.
pub struct ClientGate {
    matrix: Arc<RoutePermissionMatrix>,
    store: SessionStore,
    durable: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    policy: ExpiryPolicy,
    last_seen: Mutex<Option<Observation>>,
}

impl ClientGate {
    pub fn new(
        matrix: Arc<RoutePermissionMatrix>,
        store: SessionStore,
        durable: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            matrix,
            store,
            durable,
            navigator,
            policy: ExpiryPolicy::new(),
            last_seen: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Side-effect-free decision for `path` against `state`.
    pub fn decide(
        &self,
        path: &RoutePath,
        state: &SessionState,
        now: DateTime<Utc>,
    ) -> ClientDecision {
        let Some(rule) = self.matrix.resolve_path(path).rule() else {
            return ClientDecision::Proceed;
        };

        let token = load_token(self.durable.as_ref());
        if !self.policy.is_present_and_valid(token.as_deref(), now) {
            return ClientDecision::Redirect {
                to: RoutePath::normalize(LOGIN_PATH),
                reason: DenyReason::InvalidToken,
            };
        }

        if state.is_loading() {
            return ClientDecision::Defer;
        }

        if !state.is_authenticated() {
            return ClientDecision::Redirect {
                to: RoutePath::normalize(LOGIN_PATH),
                reason: DenyReason::NotAuthenticated,
            };
        }

        match authorize(&state.roles(), rule) {
            Ok(()) => ClientDecision::Proceed,
            Err(AuthzError::Unauthorized { required, .. }) => ClientDecision::Redirect {
                to: RoutePath::normalize(UNAUTHORIZED_PATH),
                reason: DenyReason::MissingRole { required },
            },
        }
    }

    /// Decide for `path` and carry out the result (logout, redirect).
    pub fn evaluate(&self, path: &str, now: DateTime<Utc>) -> ClientDecision {
        let path = RoutePath::normalize(path);
        let decision = self.decide(&path, &self.store.current_state(), now);
        self.apply(&path, &decision);
        self.remember(&path);
        decision
    }

    /// Evaluate only if the path or the session flags changed since the last
    /// evaluation. Returns `None` when nothing changed.
    pub fn on_change(&self, path: &str, now: DateTime<Utc>) -> Option<ClientDecision> {
        let normalized = RoutePath::normalize(path);
        let observed = Observation::new(&normalized, &self.store.current_state());
        let unchanged = self
            .last_seen
            .lock()
            .map(|last| last.as_ref() == Some(&observed))
            .unwrap_or(false);
        if unchanged {
            return None;
        }
        Some(self.evaluate(path, now))
    }

    /// Wait for the session to settle, then evaluate.
    pub async fn evaluate_settled(&self, path: &str) -> ClientDecision {
        self.store.settled().await;
        self.evaluate(path, Utc::now())
    }

    fn apply(&self, path: &RoutePath, decision: &ClientDecision) {
        let ClientDecision::Redirect { to, reason } = decision else {
            if *decision == ClientDecision::Defer {
                tracing::debug!(%path, "client gate: session loading, deferring");
            }
            return;
        };

        match reason {
            DenyReason::InvalidToken | DenyReason::NotAuthenticated => {
                tracing::info!(%path, ?reason, "client gate: signing out");
                self.store.logout();
                clear_session(self.durable.as_ref());
            }
            DenyReason::MissingRole { required } => {
                tracing::info!(%path, ?required, "client gate: role not permitted");
            }
        }

        if to == path {
            tracing::warn!(%path, "client gate: refusing to redirect to the current path");
            return;
        }
        self.navigator.redirect(to);
    }

    // Recorded after effects, so a logout this evaluation caused does not
    // count as a change.
    fn remember(&self, path: &RoutePath) {
        let observed = Observation::new(path, &self.store.current_state());
        if let Ok(mut last) = self.last_seen.lock() {
            *last = Some(observed);
        }
    }
}
