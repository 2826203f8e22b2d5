//! Session state record and its transitions.
//!
//! Every transition rewrites the whole record, so a reader never sees a
//! half-applied change (e.g. authenticated without an identity).

use serde::Serialize;

use storegate_auth::{Identity, RoleSet};

/// Who is signed in, with which token, and whether that is still being
/// worked out.
///
/// Fields are private: the only way to change them is through the
/// transitions below, which keep
/// `is_authenticated == identity.is_some() && token.is_some()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    identity: Option<Identity>,
    #[serde(skip)]
    token: Option<String>,
    is_loading: bool,
    is_authenticated: bool,
    error: Option<String>,
    #[serde(skip)]
    epoch: u64,
}

/// Proof that an initialization started at a given session epoch.
///
/// A login or logout bumps the epoch; results carried by an older ticket are
/// then discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitTicket {
    epoch: u64,
}

impl Default for SessionState {
    /// A fresh session is loading: identity is unknown until initialization
    /// settles.
    fn default() -> Self {
        Self {
            identity: None,
            token: None,
            is_loading: true,
            is_authenticated: false,
            error: None,
            epoch: 0,
        }
    }
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Roles of the signed-in user; empty when signed out.
    pub fn roles(&self) -> RoleSet {
        self.identity
            .as_ref()
            .map(|identity| identity.roles.clone())
            .unwrap_or_default()
    }

    pub(crate) fn begin_init(&mut self) -> InitTicket {
        self.is_loading = true;
        self.error = None;
        InitTicket { epoch: self.epoch }
    }

    pub(crate) fn resolve(
        &mut self,
        ticket: InitTicket,
        identity: Identity,
        token: String,
    ) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.identity = Some(identity);
        self.token = Some(token);
        self.is_loading = false;
        self.is_authenticated = true;
        self.error = None;
        true
    }

    pub(crate) fn resolve_empty(&mut self, ticket: InitTicket) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.clear();
        self.error = None;
        true
    }

    pub(crate) fn fail(&mut self, ticket: InitTicket, error: String) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.clear();
        self.error = Some(error);
        true
    }

    /// A login/logout network call is in flight.
    pub(crate) fn begin_request(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub(crate) fn request_failed(&mut self, error: String) {
        self.is_loading = false;
        self.error = Some(error);
    }

    pub(crate) fn login(&mut self, identity: Identity, token: String) {
        self.epoch += 1;
        self.identity = Some(identity);
        self.token = Some(token);
        self.is_loading = false;
        self.is_authenticated = true;
        self.error = None;
    }

    /// Returns whether anything changed.
    pub(crate) fn logout(&mut self) -> bool {
        let was_signed_out = !self.is_loading && self.identity.is_none() && self.token.is_none();
        self.epoch += 1;
        self.clear();
        !was_signed_out
    }

    fn accepts(&self, ticket: InitTicket) -> bool {
        self.is_loading && ticket.epoch == self.epoch
    }

    fn clear(&mut self) {
        self.identity = None;
        self.token = None;
        self.is_loading = false;
        self.is_authenticated = false;
    }
}
