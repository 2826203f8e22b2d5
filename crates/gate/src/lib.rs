//! `storegate-gate`: route gating for the storefront client.
//!
//! Two checkpoints run on every navigation:
//!
//! 1. [`EdgeGate`] before any page code, from the durable token alone.
//! 2. [`ClientGate`] inside the mounted app, from the session's roles.
//!
//! Both are UX guards. They read an unverified token expiry; the backend
//! remains the authority for every privileged request.

pub mod client;
pub mod config;
pub mod edge;
pub mod navigation;

pub use client::{ClientDecision, ClientGate, DenyReason};
pub use config::{ConfigError, GateConfig};
pub use edge::{EdgeGate, EdgeVerdict};
pub use navigation::{Navigator, RecordingNavigator};

/// Where unauthenticated visitors are sent by the in-app gate.
pub const LOGIN_PATH: &str = "/login";
/// Where authenticated visitors without the right role are sent.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
/// Where the edge gate sends rejected requests.
pub const HOME_PATH: &str = "/";
