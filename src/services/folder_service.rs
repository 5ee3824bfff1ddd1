//! Folder lifecycle: create, list, search, update and delete.
//!
//! Only creation is gated by group membership. Update and delete act on any
//! existing id without an ownership check, and deleting a folder leaves the
//! files filed under it in place. Callers that need stricter rules must
//! enforce them before reaching this service.

use super::{ServiceError, ServiceResult, access, identity_service::IdentityService, require_text};
use crate::{
    db::{self, FOLDER_SEQUENCE},
    models::{folder::Folder, identity::GroupSet},
};
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::{debug, info};

const FOLDER_COLUMNS: &str = "id, name, visibility, owner_email, group_id, file_count, created_at";

/// Input for creating a folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    pub name: String,
    pub visibility: bool,
    pub owner_email: String,
    pub group_id: i64,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct FolderUpdate {
    pub name: Option<String>,
    pub visibility: Option<bool>,
}

#[derive(Clone)]
pub struct FolderService {
    db: Arc<SqlitePool>,
    identities: IdentityService,
}

impl FolderService {
    pub fn new(db: Arc<SqlitePool>, identities: IdentityService) -> Self {
        Self { db, identities }
    }

    /// Create a folder in a group the owner belongs to.
    pub async fn create(&self, input: NewFolder) -> ServiceResult<Folder> {
        require_text("name", &input.name)?;
        self.identities
            .require_group(&input.owner_email, input.group_id)
            .await?;

        let mut tx = self.db.begin().await?;
        let id = db::next_id(&mut *tx, FOLDER_SEQUENCE).await?;
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "INSERT INTO folders (id, name, visibility, owner_email, group_id, file_count, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)
             RETURNING {FOLDER_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.visibility)
        .bind(&input.owner_email)
        .bind(input.group_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(id, owner = %folder.owner_email, group_id = folder.group_id, "created folder");
        Ok(folder)
    }

    /// Folders visible to `requester`.
    pub async fn list(&self, requester: &str) -> ServiceResult<Vec<Folder>> {
        let groups = self.identities.resolve_groups(requester).await?;
        let mut folders = self.in_groups(&groups).await?;
        access::retain_visible(requester, &groups, &mut folders);
        debug!(requester, count = folders.len(), "listed folders");
        Ok(folders)
    }

    /// Visible folders whose name contains `query`, ignoring case.
    pub async fn search(&self, query: &str, requester: &str) -> ServiceResult<Vec<Folder>> {
        let mut folders = self.list(requester).await?;
        folders.retain(|folder| access::name_matches(&folder.name, query));
        Ok(folders)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Folder> {
        sqlx::query_as::<_, Folder>(&format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Folder not found".into()))
    }

    /// Rename or change visibility of a folder.
    ///
    /// No ownership check is applied: any caller naming an existing id can
    /// change it.
    pub async fn update(&self, id: i64, update: FolderUpdate) -> ServiceResult<Folder> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }

        let folder = sqlx::query_as::<_, Folder>(&format!(
            "UPDATE folders
             SET name = COALESCE(?, name), visibility = COALESCE(?, visibility)
             WHERE id = ?
             RETURNING {FOLDER_COLUMNS}"
        ))
        .bind(update.name)
        .bind(update.visibility)
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Folder not found".into()))?;

        info!(id, "updated folder");
        Ok(folder)
    }

    /// Delete a folder record. Files inside it are not touched and keep
    /// pointing at the removed id. Returns whether a record was removed.
    pub async fn delete(&self, id: i64) -> ServiceResult<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(id, "deleted folder");
        } else {
            debug!(id, "delete of missing folder ignored");
        }
        Ok(removed)
    }

    /// All folders in any of `groups`, in id order.
    async fn in_groups(&self, groups: &GroupSet) -> ServiceResult<Vec<Folder>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE group_id IN ("
        ));
        let mut separated = builder.separated(", ");
        for group in groups {
            separated.push_bind(*group);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        Ok(builder
            .build_query_as::<Folder>()
            .fetch_all(&*self.db)
            .await?)
    }
}
