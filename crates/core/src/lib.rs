//! `storegate-core`: shared primitives for the storefront gate.
//!
//! This crate contains **pure** building blocks (no IO, no async).

pub mod error;
pub mod id;
pub mod path;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
pub use path::RoutePath;
