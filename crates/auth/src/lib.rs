//! `storegate-auth`: pure token and route-permission checks.
//!
//! This crate is intentionally decoupled from HTTP, storage and the session.
//!
//! Nothing here verifies a token signature. Expiry is read from an
//! unverified payload and only drives client-side routing; the backend
//! re-validates every privileged request.

pub mod authorize;
pub mod claims;
pub mod expiry;
pub mod identity;
pub mod matrix;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use claims::{Claims, DecodeError, MAX_TOKEN_LEN, decode};
pub use expiry::{ExpiryPolicy, TokenValidationError, is_valid};
pub use identity::Identity;
pub use matrix::{RouteMatch, RoutePermissionMatrix, RouteRule};
pub use roles::{Role, RoleSet, UnknownRole};
