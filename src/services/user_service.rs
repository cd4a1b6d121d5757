use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{self, AuthError};
use crate::database::models::role::normalize_role_name;
use crate::database::models::{NewUser, User, ROLE_USER};
use crate::database::{DatabaseError, Store};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("A user named '{0}' already exists")]
    UsernameTaken(String),

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("User '{0}' not found")]
    UnknownUser(String),

    #[error("Invalid password")]
    BadPassword,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Input for creating an account. `roles` holds role names; `None` means the default role set.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub roles: Option<Vec<String>>,
}

/// Create a user with a hashed password and linked roles.
///
/// Rejects empty credentials, taken usernames and role names that do not
/// exist. Without explicit roles the user gets `ROLE_USER`.
pub async fn register_user(store: &dyn Store, account: NewAccount) -> Result<User, AccountError> {
    let username = account.username.trim().to_string();
    if username.is_empty() || account.password.is_empty() {
        return Err(AccountError::InvalidInput(
            "username and password are required".to_string(),
        ));
    }

    if store.find_user_by_username(&username).await?.is_some() {
        return Err(AccountError::UsernameTaken(username));
    }

    let requested = account
        .roles
        .unwrap_or_else(|| vec![ROLE_USER.to_string()]);

    let mut role_ids = Vec::with_capacity(requested.len());
    for raw in &requested {
        let name = normalize_role_name(raw).ok_or_else(|| AccountError::UnknownRole(raw.clone()))?;
        let role = store
            .find_role_by_name(&name)
            .await?
            .ok_or(AccountError::UnknownRole(name))?;
        if !role_ids.contains(&role.id) {
            role_ids.push(role.id);
        }
    }

    let password_hash = auth::hash_password(&account.password)?;

    let user = store
        .create_user(NewUser {
            username: username.clone(),
            password_hash,
            role_ids,
        })
        .await
        .map_err(|e| match e {
            // lost the race against a concurrent insert of the same name
            DatabaseError::Conflict(_) => AccountError::UsernameTaken(username),
            other => AccountError::Database(other),
        })?;

    info!("Created user '{}' (id {}) with roles {:?}", user.username, user.id, user.roles);
    Ok(user)
}

/// Check credentials and return the user on success.
pub async fn authenticate(store: &dyn Store, username: &str, password: &str) -> Result<User, AccountError> {
    let user = store
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| AccountError::UnknownUser(username.to_string()))?;

    if !auth::verify_password(password, &user.password_hash)? {
        warn!("Rejected login for '{}': bad password", username);
        return Err(AccountError::BadPassword);
    }

    Ok(user)
}
