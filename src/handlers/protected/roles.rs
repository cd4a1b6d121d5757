use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiJson, ApiPath};
use crate::database::models::role::normalize_role_name;
use crate::database::models::Role;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: Option<String>,
}

/// GET /role
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Role>> {
    Ok(ApiResponse::success(state.store.list_roles().await?))
}

/// POST /role/create - add a role; the name is stored as `ROLE_<NAME>` (admin)
pub async fn create(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateRoleRequest>,
) -> ApiResult<Value> {
    current.require_admin()?;

    let raw = payload.name.unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(ApiError::missing_fields(&["name"]));
    }
    let name = normalize_role_name(&raw)
        .ok_or_else(|| ApiError::validation_error(format!("Invalid role name '{}'", raw), None))?;

    if state.store.find_role_by_name(&name).await?.is_some() {
        return Err(ApiError::bad_request(format!("Role '{}' already exists", name)));
    }

    let role = state.store.create_role(&name).await?;
    tracing::info!("Role {} created by '{}'", role.name, current.username);

    Ok(ApiResponse::created(json!({
        "message": "Role created",
        "role": role
    })))
}

/// DELETE /role/remove/:id (admin)
pub async fn remove(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    current.require_admin()?;

    if !state.store.delete_role(id).await? {
        return Err(ApiError::not_found(format!("Role {} not found", id)));
    }

    tracing::info!("Role {} deleted by '{}'", id, current.username);
    Ok(ApiResponse::success(json!({ "message": "Role deleted" })))
}
