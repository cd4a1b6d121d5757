use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::ApiJson;
use crate::auth::{generate_jwt, Claims};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::routes::AppState;
use crate::services;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub roles: Vec<String>,
}

/// POST /user/login - exchange credentials for a bearer token
///
/// 400 when a field is missing, 404 for an unknown username, 401 for a
/// wrong password.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let (username, password) = match (payload.username, payload.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        (u, p) => {
            let mut missing = Vec::new();
            if u.map_or(true, |u| u.is_empty()) {
                missing.push("username");
            }
            if p.map_or(true, |p| p.is_empty()) {
                missing.push("password");
            }
            return Err(ApiError::missing_fields(&missing));
        }
    };

    let user = services::authenticate(state.store.as_ref(), &username, &password).await?;

    let claims = Claims::new(user.id, user.username.clone(), user.roles.clone());
    let token = generate_jwt(&claims)?;

    tracing::info!("User '{}' logged in", user.username);

    Ok(ApiResponse::success(LoginResponse {
        token,
        username: user.username,
        roles: user.roles,
    }))
}
