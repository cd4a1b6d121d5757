//! Route table
//!
//! Public routes need no credentials. Every protected route runs
//! `jwt_auth_middleware` then `validate_user_middleware`, so handlers can
//! rely on a `CurrentUser` extension; role gates live in the handlers.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{self, SecurityConfig};
use crate::database::Store;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

pub fn app(state: AppState) -> Router {
    let config = config::config();

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.security))
                .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes)),
        )
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/user/login", post(public::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(user_routes())
        .merge(role_routes())
        .merge(project_routes())
        .merge(note_routes())
        // route_layer: unmatched paths stay 404 instead of 401.
        // Layers run bottom-up, so the token is checked before the user lookup.
        .route_layer(middleware::from_fn_with_state(state, validate_user_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/user", get(users::list))
        .route("/user/create", post(users::create))
        .route("/user/admin/create", post(users::create))
        .route("/user/:id", get(users::show))
        .route("/user/update/:id", put(users::update).patch(users::update))
        .route("/user/remove/:id", delete(users::remove))
        .route("/user/:id/assign-role/:role_id", post(users::assign_role))
}

fn role_routes() -> Router<AppState> {
    use protected::roles;

    Router::new()
        .route("/role", get(roles::list))
        .route("/role/create", post(roles::create))
        .route("/role/remove/:id", delete(roles::remove))
}

fn project_routes() -> Router<AppState> {
    use protected::projects;

    Router::new()
        .route("/projects", get(projects::list).post(projects::create))
        .route("/projects/new", post(projects::create))
        .route("/projects/:id", get(projects::show))
        .route("/projects/:id/edit", put(projects::update))
        .route("/projects/:id/delete", delete(projects::remove))
        .route("/projects/:id/add-user", post(projects::add_user))
        .route("/projects/:id/remove-user/:user_id", post(projects::remove_user))
}

fn note_routes() -> Router<AppState> {
    use protected::notes;

    Router::new()
        .route("/notes/project/:id", get(notes::list_for_project).post(notes::create))
        .route("/notes/user/:id", get(notes::list_for_user))
        .route("/notes/:id", delete(notes::remove))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
