use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::database::models::{User, ROLE_ADMIN, ROLE_MANAGER};
use crate::error::ApiError;
use crate::routes::AppState;

/// The caller, re-read from the store on every request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            roles: user.roles,
        }
    }
}

impl CurrentUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Admins and managers may change projects and their membership.
    pub fn can_manage_projects(&self) -> bool {
        self.is_admin() || self.has_role(ROLE_MANAGER)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            return Ok(());
        }
        tracing::warn!("User '{}' denied: {} required", self.username, ROLE_ADMIN);
        Err(ApiError::forbidden("Insufficient privileges: ROLE_ADMIN required"))
    }

    pub fn require_project_manager(&self) -> Result<(), ApiError> {
        if self.can_manage_projects() {
            return Ok(());
        }
        tracing::warn!("User '{}' denied: project management required", self.username);
        Err(ApiError::forbidden(
            "Insufficient privileges: ROLE_ADMIN or ROLE_MANAGER required",
        ))
    }
}

/// Middleware that resolves the token's user against the store.
/// Runs after `jwt_auth_middleware`; a token for a deleted user is rejected.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = state.store.find_user(auth_user.user_id).await?.ok_or_else(|| {
        tracing::warn!(
            "User validation failed: '{}' (id {}) no longer exists",
            auth_user.username,
            auth_user.user_id
        );
        ApiError::unauthorized(format!("User '{}' no longer exists", auth_user.username))
    })?;

    let current = CurrentUser::from(user);
    tracing::debug!("Authenticated '{}' with roles {:?}", current.username, current.roles);

    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(roles: &[&str]) -> CurrentUser {
        CurrentUser {
            id: 1,
            username: "carol".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn admin_passes_every_gate() {
        let admin = user_with(&["ROLE_ADMIN"]);
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_project_manager().is_ok());
    }

    #[test]
    fn manager_only_manages_projects() {
        let manager = user_with(&["ROLE_MANAGER", "ROLE_USER"]);
        assert!(manager.require_admin().is_err());
        assert!(manager.require_project_manager().is_ok());
    }

    #[test]
    fn plain_user_is_denied() {
        let user = user_with(&["ROLE_USER"]);
        assert!(user.require_admin().is_err());
        assert!(user.require_project_manager().is_err());
    }
}
