//! Route → allowed-roles table.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use storegate_core::{DomainError, DomainResult, RoutePath};

use crate::roles::{Role, RoleSet};

/// One protected route prefix and the roles allowed through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: RoutePath,
    #[serde(alias = "roles")]
    pub allowed_roles: RoleSet,
}

impl RouteRule {
    pub fn new(prefix: &str, allowed_roles: impl IntoIterator<Item = Role>) -> DomainResult<Self> {
        Ok(Self {
            prefix: RoutePath::parse(prefix)?,
            allowed_roles: allowed_roles.into_iter().collect(),
        })
    }

    /// Whether `roles` intersects the allowed set.
    pub fn permits(&self, roles: &RoleSet) -> bool {
        !self.allowed_roles.is_disjoint(roles)
    }
}

/// Result of resolving a path against the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch<'a> {
    Rule(&'a RouteRule),
    Unmatched,
}

impl<'a> RouteMatch<'a> {
    pub fn rule(self) -> Option<&'a RouteRule> {
        match self {
            RouteMatch::Rule(rule) => Some(rule),
            RouteMatch::Unmatched => None,
        }
    }

    pub fn is_unmatched(self) -> bool {
        matches!(self, RouteMatch::Unmatched)
    }
}

/// Static table of protected prefixes.
///
/// Resolution picks the longest prefix the path falls under, so declaration
/// order never matters. Paths under no prefix are [`RouteMatch::Unmatched`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePermissionMatrix {
    rules: Vec<RouteRule>,
}

impl RoutePermissionMatrix {
    /// Build a matrix; duplicate prefixes are rejected.
    pub fn new(rules: Vec<RouteRule>) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.prefix.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate route prefix '{}'",
                    rule.prefix
                )));
            }
        }
        Ok(Self { rules })
    }

    /// The storefront's default table.
    pub fn storefront() -> Self {
        use Role::{Admin, Customer, Delivery};

        let rule = |prefix: &str, roles: &[Role]| RouteRule {
            prefix: RoutePath::normalize(prefix),
            allowed_roles: roles.iter().copied().collect(),
        };

        Self {
            rules: vec![
                rule("/reports", &[Admin]),
                rule("/admin", &[Admin]),
                rule("/orders", &[Customer, Admin]),
                rule("/cart", &[Customer, Admin]),
                rule("/deliveries", &[Delivery, Admin]),
                rule("/dashboard", &[Customer, Admin, Delivery]),
                rule("/profile", &[Customer, Admin, Delivery]),
            ],
        }
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Resolve a raw navigation path (query/fragment ignored).
    pub fn resolve(&self, path: &str) -> RouteMatch<'_> {
        self.resolve_path(&RoutePath::normalize(path))
    }

    pub fn resolve_path(&self, path: &RoutePath) -> RouteMatch<'_> {
        self.rules
            .iter()
            .filter(|rule| path.is_within(&rule.prefix))
            .max_by_key(|rule| rule.prefix.as_str().len())
            .map_or(RouteMatch::Unmatched, RouteMatch::Rule)
    }

    /// Whether any rule governs `path`.
    pub fn is_protected(&self, path: &RoutePath) -> bool {
        !self.resolve_path(path).is_unmatched()
    }
}

impl Default for RoutePermissionMatrix {
    fn default() -> Self {
        Self::storefront()
    }
}
