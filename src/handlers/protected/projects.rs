use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiJson, ApiPath, ProjectView, UserView};
use crate::database::models::{NewProject, Project, ProjectChanges, User};
use crate::database::Store;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub project: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub project: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<i32>,
}

async fn load_project(store: &dyn Store, id: i32) -> Result<Project, ApiError> {
    store
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Project {} not found", id)))
}

async fn load_user(store: &dyn Store, id: i32) -> Result<User, ApiError> {
    store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))
}

/// GET /projects - every project with members and notes
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ProjectView>> {
    let store = state.store.as_ref();
    let projects = store.list_projects().await?;

    let mut views = Vec::with_capacity(projects.len());
    for project in projects {
        views.push(ProjectView::load(store, project).await?);
    }
    Ok(ApiResponse::success(views))
}

/// POST /projects, /projects/new (admin)
pub async fn create(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateProjectRequest>,
) -> ApiResult<Value> {
    current.require_admin()?;

    let name = payload.project.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(ApiError::missing_fields(&["project"]));
    }

    if state.store.find_project_by_name(&name).await?.is_some() {
        return Err(ApiError::bad_request(format!("Project '{}' already exists", name)));
    }

    // the unique constraint still catches a concurrent insert as a Conflict
    let project = state
        .store
        .create_project(NewProject {
            name,
            description: payload.description.unwrap_or_default(),
        })
        .await?;

    tracing::info!("Project '{}' (id {}) created by '{}'", project.name, project.id, current.username);

    Ok(ApiResponse::created(json!({
        "message": "Project created",
        "project_id": project.id
    })))
}

/// GET /projects/:id
pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<ProjectView> {
    let store = state.store.as_ref();
    let project = load_project(store, id).await?;
    Ok(ApiResponse::success(ProjectView::load(store, project).await?))
}

/// PUT /projects/:id/edit (admin or manager)
pub async fn update(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UpdateProjectRequest>,
) -> ApiResult<ProjectView> {
    current.require_project_manager()?;
    let store = state.store.as_ref();

    let project = load_project(store, id).await?;

    let mut changes = ProjectChanges {
        name: None,
        description: payload.description,
    };

    if let Some(name) = payload.project {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::validation_error("project must not be empty", None));
        }
        if let Some(other) = store.find_project_by_name(&name).await? {
            if other.id != project.id {
                return Err(ApiError::bad_request(format!("Project '{}' already exists", name)));
            }
        }
        changes.name = Some(name);
    }

    let updated = store
        .update_project(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Project {} not found", id)))?;

    tracing::info!("Project {} updated by '{}'", updated.id, current.username);
    Ok(ApiResponse::success(ProjectView::load(store, updated).await?))
}

/// DELETE /projects/:id/delete (admin or manager)
///
/// Notes of the project survive with a null project.
pub async fn remove(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    current.require_project_manager()?;

    if !state.store.delete_project(id).await? {
        return Err(ApiError::not_found(format!("Project {} not found", id)));
    }

    tracing::info!("Project {} deleted by '{}'", id, current.username);
    Ok(ApiResponse::success(json!({ "message": "Project deleted" })))
}

/// POST /projects/:id/add-user - body `{"userId": n}` (admin or manager)
pub async fn add_user(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<AddUserRequest>,
) -> ApiResult<Value> {
    current.require_project_manager()?;
    let store = state.store.as_ref();

    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::missing_fields(&["userId"]))?;

    let project = load_project(store, id).await?;
    let user = load_user(store, user_id).await?;

    if !store.add_project_member(project.id, user.id).await? {
        return Err(ApiError::bad_request(format!(
            "User '{}' is already a member of project '{}'",
            user.username, project.name
        )));
    }

    tracing::info!("Added '{}' to project '{}'", user.username, project.name);

    Ok(ApiResponse::success(json!({
        "message": "User added to project",
        "user": UserView::from(&user)
    })))
}

/// POST /projects/:id/remove-user/:user_id (admin or manager)
///
/// Removing a non-member succeeds without changes.
pub async fn remove_user(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath((id, user_id)): ApiPath<(i32, i32)>,
) -> ApiResult<Value> {
    current.require_project_manager()?;
    let store = state.store.as_ref();

    let project = load_project(store, id).await?;
    let user = load_user(store, user_id).await?;

    if store.remove_project_member(project.id, user.id).await? {
        tracing::info!("Removed '{}' from project '{}'", user.username, project.name);
    }

    Ok(ApiResponse::success(json!({ "message": "User removed from project" })))
}
