use serde::Serialize;
use sqlx::FromRow;

/// A user with its effective roles (names of linked Role rows)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role_ids: Vec<i32>,
}

/// Partial update; `role_ids` replaces every role link when present.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub role_ids: Option<Vec<i32>>,
}
