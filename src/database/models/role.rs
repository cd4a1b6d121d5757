use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ROLE_PREFIX: &str = "ROLE_";
pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_MANAGER: &str = "ROLE_MANAGER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

/// Normalize a role name to the `ROLE_*` convention.
///
/// Trims, upper-cases and adds the prefix when missing, so `"Manager"`
/// becomes `"ROLE_MANAGER"`. Returns `None` for names that are empty or
/// consist of the bare prefix.
pub fn normalize_role_name(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    let bare = upper.strip_prefix(ROLE_PREFIX).unwrap_or(&upper);
    if bare.is_empty() {
        return None;
    }
    Some(format!("{}{}", ROLE_PREFIX, bare))
}

/// Distinct role names in ascending order.
pub fn aggregate_roles<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut roles: Vec<String> = names.into_iter().map(Into::into).collect();
    roles.sort();
    roles.dedup();
    roles
}
