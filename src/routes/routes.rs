//! Defines routes for identity, folder and file operations.
//!
//! ## Structure
//! - **Probes** (mounted at root)
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **Auth** (`/api/auth`)
//!   - `POST   /login`
//!   - `POST   /register/supervisor`
//!   - `POST   /register/student`
//!
//! - **Folders** (`/api/folders`)
//!   - `GET    /` - list visible folders (`?ownerEmail=`)
//!   - `POST   /` - create folder
//!   - `GET    /search` - search visible folders (`?query=&ownerEmail=`)
//!   - `PUT    /{id}` - rename / change visibility
//!   - `DELETE /{id}` - delete folder (files are kept)
//!
//! - **Files** (`/api/files`)
//!   - `GET    /` - list visible files in a folder (`?folderId=&ownerEmail=`)
//!   - `POST   /` - multipart upload
//!   - `GET    /search` - search visible files (`?query=&ownerEmail=`)
//!   - `GET    /download/{id}` - stream file content
//!   - `DELETE /{id}` - delete file and its stored payload

use crate::{
    handlers::{
        auth_handlers::{login, register_student, register_supervisor},
        file_handlers::{delete_file, download_file, list_files, search_files, upload_file},
        folder_handlers::{
            create_folder, delete_folder, list_folders, search_folders, update_folder,
        },
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

/// Build and return the router for all API routes.
///
/// `max_upload_bytes` bounds the body accepted by the upload endpoint.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    let auth = Router::new()
        .route("/login", post(login))
        .route("/register/supervisor", post(register_supervisor))
        .route("/register/student", post(register_student));

    let folders = Router::new()
        .route("/", get(list_folders).post(create_folder))
        .route("/search", get(search_folders))
        .route("/{id}", put(update_folder).delete(delete_folder));

    let files = Router::new()
        .route(
            "/",
            get(list_files)
                .post(upload_file)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/search", get(search_files))
        .route("/download/{id}", get(download_file))
        .route("/{id}", delete(delete_file));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest("/api/auth", auth)
        .nest("/api/folders", folders)
        .nest("/api/files", files)
}
