pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

#[cfg(test)]
pub mod testing;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("project_tracker=info,tower_http=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
