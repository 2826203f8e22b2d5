//! `storegate-session`: the single session record of a storefront client.
//!
//! - [`SessionStore`]: owned, injectable container for [`SessionState`]
//! - [`IdentitySession`]: one-shot initialization plus login/logout
//! - [`TokenStore`]: durable `token`/`user` slots
//! - [`AuthBackend`]: the backend's auth endpoints ([`HttpAuthClient`])

pub mod backend;
pub mod http;
pub mod session;
pub mod state;
pub mod store;
pub mod token_store;

pub use backend::{AuthBackend, Credentials, FetchError, LoginResponse};
pub use http::HttpAuthClient;
pub use session::{IdentitySession, InitOutcome, SessionError};
pub use state::{InitTicket, SessionState};
pub use store::SessionStore;
pub use token_store::{
    FileTokenStore, InMemoryTokenStore, TOKEN_KEY, TokenStore, TokenStoreError, USER_KEY,
    clear_session, load_identity, load_token,
};
