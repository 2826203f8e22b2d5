use thiserror::Error;

use storegate_core::RoutePath;

use crate::matrix::RouteRule;
use crate::roles::{Role, RoleSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unauthorized: '{prefix}' requires one of {required:?}")]
    Unauthorized { prefix: RoutePath, required: Vec<Role> },
}

/// Check a role set against the rule governing a route.
///
/// - No IO
/// - No panics
/// - An empty role set is simply unauthorized
pub fn authorize(roles: &RoleSet, rule: &RouteRule) -> Result<(), AuthzError> {
    if rule.permits(roles) {
        Ok(())
    } else {
        Err(AuthzError::Unauthorized {
            prefix: rule.prefix.clone(),
            required: rule.allowed_roles.iter().copied().collect(),
        })
    }
}
