//! Wiring behind the `storegate-cli` binary.
//!
//! One [`App`] corresponds to one application load: it initializes the
//! session at most once, so each command runs in a fresh `App`.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use storegate_core::RoutePath;
use storegate_gate::{
    ClientDecision, ClientGate, ConfigError, EdgeGate, EdgeVerdict, GateConfig, RecordingNavigator,
};
use storegate_session::{
    AuthBackend, Credentials, IdentitySession, SessionError, SessionState, SessionStore, TokenStore,
};

/// Default location of the durable session file.
pub const DEFAULT_STATE_FILE: &str = ".storegate/session.json";

/// Everything a `check` run decided, in evaluation order.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub path: RoutePath,
    pub edge: EdgeVerdict,
    /// `None` when the edge denied; the app never mounted.
    pub client: Option<ClientDecision>,
    pub redirects: Vec<RoutePath>,
    pub session: SessionState,
}

pub struct App {
    edge: EdgeGate,
    session: IdentitySession,
    client_gate: ClientGate,
    navigator: Arc<RecordingNavigator>,
}

impl App {
    pub fn new(
        config: &GateConfig,
        durable: Arc<dyn TokenStore>,
        backend: Arc<dyn AuthBackend>,
    ) -> Result<Self, ConfigError> {
        let matrix = config.matrix()?;
        let policy = config.expiry_policy()?;
        let store = SessionStore::new();
        let navigator = Arc::new(RecordingNavigator::new());

        let client_gate = ClientGate::new(matrix, store.clone(), durable.clone(), navigator.clone())
            .with_policy(policy);
        let session = IdentitySession::new(store, durable, backend).with_policy(policy);

        Ok(Self {
            edge: config.edge_gate()?,
            session,
            client_gate,
            navigator,
        })
    }

    /// Edge gate, then (if allowed) initialization and the in-app gate.
    pub async fn check(&self, path: &str) -> CheckReport {
        let edge = self
            .edge
            .check(path, self.session.durable().as_ref(), Utc::now());

        let client = if edge.is_allowed() {
            let outcome = self.session.initialize(Utc::now()).await;
            tracing::debug!(?outcome, "session initialized");
            Some(self.client_gate.evaluate_settled(path).await)
        } else {
            None
        };

        CheckReport {
            path: RoutePath::normalize(path),
            edge,
            client,
            redirects: self.navigator.redirects(),
            session: self.session.store().current_state(),
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<SessionState, SessionError> {
        self.session.sign_in(credentials).await?;
        Ok(self.session.store().current_state())
    }

    pub async fn logout(&self) -> SessionState {
        self.session.sign_out().await;
        self.session.store().current_state()
    }
}
