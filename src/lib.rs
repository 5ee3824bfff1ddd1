//! Group-scoped folder and file sharing service.
//!
//! Supervisors and students belong to numeric groups. Folders and files are
//! created inside a group the creator belongs to and are visible to group
//! members when public, or to their owner when private. Metadata lives in
//! SQLite; uploaded payloads live on local disk.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Full application router with shared state, request tracing and
/// permissive CORS for the browser client.
pub fn app(state: state::AppState, max_upload_bytes: usize) -> Router {
    routes::routes::routes(max_upload_bytes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
