use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::{generate_jwt, Claims};
use crate::database::models::User;
use crate::routes::{app, AppState};
use crate::services::{register_user, NewAccount};

pub mod memory;

pub use memory::MemoryStore;

/// Router over a fresh in-memory store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = app(AppState::new(store.clone()));
        Self { store, router }
    }

    /// Create a user through the account service. Empty `roles` means the default role.
    pub async fn seed_user(&self, username: &str, password: &str, roles: &[&str]) -> User {
        let roles = if roles.is_empty() {
            None
        } else {
            Some(roles.iter().map(|r| r.to_string()).collect())
        };
        register_user(
            self.store.as_ref(),
            NewAccount {
                username: username.to_string(),
                password: password.to_string(),
                roles,
            },
        )
        .await
        .expect("seed user")
    }

    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.id, user.username.clone(), user.roles.clone());
        generate_jwt(&claims).expect("token")
    }

    /// Send one request and return the status with the parsed JSON body
    /// (`Value::Null` when the body is empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }
}
