use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiJson, ApiPath};
use crate::database::models::{NewNote, Note};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub content: Option<String>,
}

/// GET /notes/project/:id
pub async fn list_for_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Vec<Note>> {
    if state.store.find_project(id).await?.is_none() {
        return Err(ApiError::not_found(format!("Project {} not found", id)));
    }
    Ok(ApiResponse::success(state.store.notes_for_project(id).await?))
}

/// POST /notes/project/:id - the caller becomes the author
pub async fn create(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<CreateNoteRequest>,
) -> ApiResult<Note> {
    let project = state
        .store
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Project {} not found", id)))?;

    let content = match payload.content {
        Some(content) if !content.trim().is_empty() => content,
        _ => return Err(ApiError::missing_fields(&["content"])),
    };

    let note = state
        .store
        .create_note(NewNote {
            project_id: Some(project.id),
            content,
            author: current.username.clone(),
            author_id: Some(current.id),
        })
        .await?;

    tracing::debug!("Note {} added to project '{}' by '{}'", note.id, project.name, note.author);
    Ok(ApiResponse::created(note))
}

/// DELETE /notes/:id - author or admin only
pub async fn remove(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    let note = state
        .store
        .find_note(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Note {} not found", id)))?;

    if note.author_id != Some(current.id) && !current.is_admin() {
        tracing::warn!("User '{}' denied deleting note {} by '{}'", current.username, note.id, note.author);
        return Err(ApiError::forbidden("Only the author or an admin can delete this note"));
    }

    state.store.delete_note(note.id).await?;
    tracing::info!("Note {} deleted by '{}'", note.id, current.username);

    Ok(ApiResponse::success(json!({ "message": "Note deleted" })))
}

/// GET /notes/user/:id - the caller's own notes; the path id is not consulted
pub async fn list_for_user(
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    ApiPath(_id): ApiPath<i32>,
) -> ApiResult<Vec<Note>> {
    Ok(ApiResponse::success(state.store.notes_by_author(current.id).await?))
}
