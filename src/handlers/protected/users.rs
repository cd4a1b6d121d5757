use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiJson, ApiPath, UserView};
use crate::database::models::UserChanges;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::routes::AppState;
use crate::services::{self, NewAccount};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Role names; omitted means `ROLE_USER`.
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    /// Role ids replacing every current link.
    pub roles: Option<Vec<i32>>,
}

/// POST /user/create, /user/admin/create - create a user (admin)
pub async fn create(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> ApiResult<Value> {
    current.require_admin()?;

    let mut missing = Vec::new();
    if payload.username.as_deref().map_or(true, |u| u.trim().is_empty()) {
        missing.push("username");
    }
    if payload.password.as_deref().map_or(true, str::is_empty) {
        missing.push("password");
    }
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let account = NewAccount {
        username: payload.username.unwrap_or_default(),
        password: payload.password.unwrap_or_default(),
        roles: payload.roles,
    };
    let user = services::register_user(state.store.as_ref(), account).await?;

    Ok(ApiResponse::created(json!({
        "message": "User created",
        "user_id": user.id
    })))
}

/// GET /user - every user with its roles
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<UserView>> {
    let users = state.store.list_users().await?;
    Ok(ApiResponse::success(users.iter().map(UserView::from).collect()))
}

/// GET /user/:id
pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<UserView> {
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
    Ok(ApiResponse::success(UserView::from(&user)))
}

/// PUT|PATCH /user/update/:id - rename and/or replace role links (admin)
///
/// Every role id is resolved before anything is written, so an unknown id
/// leaves the user untouched.
pub async fn update(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> ApiResult<Value> {
    current.require_admin()?;
    let store = state.store.as_ref();

    let user = store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;

    let mut changes = UserChanges::default();

    if let Some(username) = payload.username {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(ApiError::validation_error("username must not be empty", None));
        }
        if let Some(other) = store.find_user_by_username(&username).await? {
            if other.id != user.id {
                return Err(ApiError::bad_request(format!("A user named '{}' already exists", username)));
            }
        }
        changes.username = Some(username);
    }

    if let Some(role_ids) = payload.roles {
        for role_id in &role_ids {
            if store.find_role(*role_id).await?.is_none() {
                return Err(ApiError::not_found(format!("Role {} not found", role_id)));
            }
        }
        changes.role_ids = Some(role_ids);
    }

    let updated = store
        .update_user(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;

    tracing::info!("User {} updated by '{}': roles {:?}", updated.id, current.username, updated.roles);

    Ok(ApiResponse::success(json!({
        "message": "User updated",
        "user": UserView::from(&updated)
    })))
}

/// DELETE /user/remove/:id (admin)
pub async fn remove(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    current.require_admin()?;

    if !state.store.delete_user(id).await? {
        return Err(ApiError::not_found(format!("User {} not found", id)));
    }

    tracing::info!("User {} deleted by '{}'", id, current.username);
    Ok(ApiResponse::success(json!({ "message": "User deleted" })))
}

/// POST /user/:id/assign-role/:role_id - link a role (admin, idempotent)
pub async fn assign_role(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath((id, role_id)): ApiPath<(i32, i32)>,
) -> ApiResult<Value> {
    current.require_admin()?;
    let store = state.store.as_ref();

    if store.find_user(id).await?.is_none() {
        return Err(ApiError::not_found(format!("User {} not found", id)));
    }
    let role = store
        .find_role(role_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Role {} not found", role_id)))?;

    store.assign_role(id, role.id).await?;

    // re-read: the user may have been deleted concurrently
    let user = store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;

    tracing::info!("Assigned {} to user '{}'", role.name, user.username);

    Ok(ApiResponse::success(json!({
        "message": format!("Role {} assigned", role.name),
        "roles": user.roles
    })))
}
