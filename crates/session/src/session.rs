use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;

use storegate_auth::{ExpiryPolicy, Identity};

use crate::backend::{AuthBackend, Credentials, FetchError};
use crate::store::SessionStore;
use crate::token_store::{TokenStore, clear_session, load_token, save_identity, save_session};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("identity fetch failed: {0}")]
    IdentityFetchFailed(FetchError),

    #[error("account is inactive")]
    InactiveAccount,

    #[error("login failed: {0}")]
    LoginFailed(FetchError),
}

/// How a call to [`IdentitySession::initialize`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Authenticated,
    /// No usable durable token.
    Anonymous,
    /// The fetch failed; the durable token was cleared.
    Failed(SessionError),
    /// A login/logout happened while the fetch was pending; its result was
    /// discarded.
    Superseded,
    /// Initialization had already been started by an earlier call.
    AlreadyStarted,
}

/// Populates the session once per application load and runs the
/// login/logout exchanges.
///
/// Owns no state of its own beyond the one-shot guard: everything observable
/// lives in the injected [`SessionStore`] and [`TokenStore`].
pub struct IdentitySession {
    store: SessionStore,
    durable: Arc<dyn TokenStore>,
    backend: Arc<dyn AuthBackend>,
    policy: ExpiryPolicy,
    started: AtomicBool,
}

impl IdentitySession {
    pub fn new(
        store: SessionStore,
        durable: Arc<dyn TokenStore>,
        backend: Arc<dyn AuthBackend>,
    ) -> Self {
        Self {
            store,
            durable,
            backend,
            policy: ExpiryPolicy::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn durable(&self) -> &Arc<dyn TokenStore> {
        &self.durable
    }

    /// One-shot "who am I" initialization.
    ///
    /// Only the first call does anything; later calls (pending or not) return
    /// [`InitOutcome::AlreadyStarted`] without touching the backend.
    pub async fn initialize(&self, now: DateTime<Utc>) -> InitOutcome {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!("session initialization already started; ignoring");
            return InitOutcome::AlreadyStarted;
        }

        let ticket = self.store.begin_init();

        let Some(token) = load_token(self.durable.as_ref()) else {
            return if self.store.resolve_empty(ticket) {
                InitOutcome::Anonymous
            } else {
                InitOutcome::Superseded
            };
        };

        if !self.policy.is_valid(&token, now) {
            tracing::info!("durable token expired or unreadable; starting anonymous");
            return if self.store.resolve_empty(ticket) {
                clear_session(self.durable.as_ref());
                InitOutcome::Anonymous
            } else {
                InitOutcome::Superseded
            };
        }

        let error = match self.backend.fetch_identity(&token).await {
            Ok(identity) if identity.active => {
                if !self.store.resolve(ticket, identity.clone(), token) {
                    return InitOutcome::Superseded;
                }
                if let Err(e) = save_identity(self.durable.as_ref(), &identity) {
                    tracing::warn!(error = %e, "failed to cache identity");
                }
                return InitOutcome::Authenticated;
            }
            Ok(identity) => {
                tracing::info!(user_id = %identity.id, "identity is inactive");
                SessionError::InactiveAccount
            }
            Err(e) => SessionError::IdentityFetchFailed(e),
        };

        if self.store.fail(ticket, error.to_string()) {
            clear_session(self.durable.as_ref());
            InitOutcome::Failed(error)
        } else {
            InitOutcome::Superseded
        }
    }

    /// Exchange credentials for a token and sign in.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, SessionError> {
        self.store.begin_request();

        match self.backend.login(credentials).await {
            Ok(resp) if !resp.identity.active => {
                let error = SessionError::InactiveAccount;
                self.store.request_failed(error.to_string());
                Err(error)
            }
            Ok(resp) => {
                if let Err(e) = save_session(self.durable.as_ref(), &resp.token, &resp.identity) {
                    tracing::warn!(error = %e, "failed to persist session");
                }
                self.store.login(resp.identity.clone(), resp.token);
                Ok(resp.identity)
            }
            Err(e) => {
                let error = SessionError::LoginFailed(e);
                self.store.request_failed(error.to_string());
                Err(error)
            }
        }
    }

    /// Notify the backend, then tear the session down.
    ///
    /// The local teardown happens even if the backend call fails.
    pub async fn sign_out(&self) {
        let token = self
            .store
            .current_state()
            .token()
            .map(str::to_owned)
            .or_else(|| load_token(self.durable.as_ref()));

        if let Some(token) = token {
            self.store.begin_request();
            if let Err(e) = self.backend.logout(&token).await {
                tracing::warn!(error = %e, "backend logout failed; signing out locally");
            }
        }

        self.end_session();
    }

    /// Local teardown: clear the session and both durable keys.
    pub fn end_session(&self) {
        self.store.logout();
        clear_session(self.durable.as_ref());
    }
}
