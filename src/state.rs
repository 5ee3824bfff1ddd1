use crate::services::{
    blob_store::BlobStore, file_service::FileService, folder_service::FolderService,
    identity_service::IdentityService,
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Shared SQLite connection pool, also used by the readiness probe.
    pub db: Arc<SqlitePool>,
    pub identities: IdentityService,
    pub folders: FolderService,
    pub files: FileService,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, storage_dir: impl Into<PathBuf>) -> Self {
        let identities = IdentityService::new(db.clone());
        let folders = FolderService::new(db.clone(), identities.clone());
        let files = FileService::new(db.clone(), identities.clone(), BlobStore::new(storage_dir));
        Self {
            db,
            identities,
            folders,
            files,
        }
    }
}
