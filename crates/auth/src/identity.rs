use serde::{Deserialize, Deserializer, Serialize};

use storegate_core::UserId;

use crate::roles::{Role, RoleSet};

/// The signed-in storefront user, as returned by the "who am I" endpoint.
///
/// The role set may be empty; that is a normal state, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    #[serde(alias = "name", alias = "displayName")]
    pub display_name: String,
    #[serde(default = "default_active", alias = "isActive")]
    pub active: bool,
    #[serde(default, alias = "role", deserialize_with = "deserialize_roles")]
    pub roles: RoleSet,
}

fn default_active() -> bool {
    true
}

impl Identity {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        display_name: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: display_name.into(),
            active: true,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the user holds at least one of `allowed`.
    pub fn has_any_role(&self, allowed: &RoleSet) -> bool {
        !self.roles.is_disjoint(allowed)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoles {
    One(String),
    Many(Vec<String>),
}

/// Accepts a single role string or a list; unknown names are dropped.
fn deserialize_roles<'de, D>(deserializer: D) -> Result<RoleSet, D::Error>
where
    D: Deserializer<'de>,
{
    let names = match Option::<RawRoles>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(RawRoles::One(name)) => vec![name],
        Some(RawRoles::Many(names)) => names,
    };

    Ok(names
        .iter()
        .filter_map(|name| match name.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring role from identity payload");
                None
            }
        })
        .collect())
}
