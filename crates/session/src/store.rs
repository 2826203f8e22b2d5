use std::sync::Arc;

use tokio::sync::watch;

use storegate_auth::Identity;

use crate::state::{InitTicket, SessionState};

/// Owner of the one [`SessionState`] of a running client.
///
/// Cloning yields another handle to the same state. Each transition is a
/// single `send_modify`/`send_if_modified`, so transitions apply atomically
/// and in call order; subscribers observe every committed state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current state.
    pub fn current_state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Wait until no initialization or login/logout call is in flight.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.current_state(),
        }
    }

    pub fn begin_init(&self) -> InitTicket {
        let mut ticket = InitTicket::default();
        self.tx.send_modify(|state| ticket = state.begin_init());
        tracing::debug!("session initialization started");
        ticket
    }

    /// Returns `false` when the ticket was superseded by a login/logout.
    pub fn resolve(&self, ticket: InitTicket, identity: Identity, token: String) -> bool {
        let user_id = identity.id;
        let applied = self
            .tx
            .send_if_modified(|state| state.resolve(ticket, identity, token));
        if applied {
            tracing::info!(%user_id, "session initialized (authenticated)");
        } else {
            tracing::debug!(%user_id, "discarding superseded initialization result");
        }
        applied
    }

    pub fn resolve_empty(&self, ticket: InitTicket) -> bool {
        let applied = self.tx.send_if_modified(|state| state.resolve_empty(ticket));
        if applied {
            tracing::info!("session initialized (anonymous)");
        }
        applied
    }

    pub fn fail(&self, ticket: InitTicket, error: impl Into<String>) -> bool {
        let error = error.into();
        let applied = self
            .tx
            .send_if_modified(|state| state.fail(ticket, error.clone()));
        if applied {
            tracing::warn!(%error, "session initialization failed");
        }
        applied
    }

    pub fn begin_request(&self) {
        self.tx.send_modify(SessionState::begin_request);
    }

    pub fn request_failed(&self, error: impl Into<String>) {
        let error = error.into();
        tracing::warn!(%error, "session request failed");
        self.tx.send_modify(|state| state.request_failed(error));
    }

    pub fn login(&self, identity: Identity, token: String) {
        tracing::info!(user_id = %identity.id, "session signed in");
        self.tx.send_modify(|state| state.login(identity, token));
    }

    /// Clear identity and token. Always leaves the session signed out.
    pub fn logout(&self) {
        if self.tx.send_if_modified(SessionState::logout) {
            tracing::info!("session signed out");
        }
    }
}
