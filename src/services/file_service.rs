//! File lifecycle: upload, list by folder, search, download and delete.
//!
//! Uploads are gated by group membership before any bytes touch the disk.
//! The file record and the parent folder's `file_count` change together in
//! one transaction. Download and delete act on any existing id without an
//! access check.

use super::{
    ServiceError, ServiceResult, access, blob_store::BlobStore, identity_service::IdentityService,
    require_text,
};
use crate::{
    db::{self, FILE_SEQUENCE},
    models::{file::File, identity::GroupSet},
};
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{io, sync::Arc};
use tracing::{debug, info, warn};

const FILE_COLUMNS: &str = "id, name, folder_id, visibility, owner_email, group_id, \
     storage_path, content_type, size_bytes, checksum, created_at";

/// Metadata accompanying an upload.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub folder_id: i64,
    pub visibility: bool,
    pub owner_email: String,
    pub group_id: i64,
    /// Filename as sent by the client; used to build the stored blob name.
    pub original_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Clone)]
pub struct FileService {
    db: Arc<SqlitePool>,
    identities: IdentityService,
    blobs: BlobStore,
}

impl FileService {
    pub fn new(db: Arc<SqlitePool>, identities: IdentityService, blobs: BlobStore) -> Self {
        Self {
            db,
            identities,
            blobs,
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Store an uploaded payload and record it in `input.folder_id`.
    ///
    /// The folder is not required to exist; when it does it must belong to
    /// `input.group_id` and its `file_count` is incremented. If the record
    /// cannot be committed the blob is removed.
    pub async fn upload<S>(&self, input: NewFile, stream: S) -> ServiceResult<File>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        require_text("name", &input.name)?;
        require_text("ownerEmail", &input.owner_email)?;
        self.identities
            .require_group(&input.owner_email, input.group_id)
            .await?;
        self.require_folder_group(input.folder_id, input.group_id)
            .await?;

        let original_name = input.original_name.as_deref().unwrap_or(&input.name);
        let blob = self.blobs.put_stream(original_name, stream).await?;

        let committed = self
            .insert_record(&input, &blob.stored_name, blob.size_bytes, &blob.checksum)
            .await;
        match committed {
            Ok(file) => {
                info!(
                    id = file.id,
                    folder_id = file.folder_id,
                    owner = %file.owner_email,
                    size_bytes = file.size_bytes,
                    "uploaded file"
                );
                Ok(file)
            }
            Err(err) => {
                if let Err(cleanup) = self.blobs.remove(&blob.stored_name).await {
                    warn!(
                        stored_name = %blob.stored_name,
                        "failed to remove orphaned blob: {}",
                        cleanup
                    );
                }
                Err(err)
            }
        }
    }

    /// An existing folder only accepts files filed under its own group.
    async fn require_folder_group(&self, folder_id: i64, group_id: i64) -> ServiceResult<()> {
        let folder_group =
            sqlx::query_scalar::<_, i64>("SELECT group_id FROM folders WHERE id = ?")
                .bind(folder_id)
                .fetch_optional(&*self.db)
                .await?;
        match folder_group {
            Some(owner_group) if owner_group != group_id => {
                debug!(folder_id, owner_group, group_id, "upload group does not match folder");
                Err(ServiceError::Forbidden(
                    "You do not have access to this group".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    async fn insert_record(
        &self,
        input: &NewFile,
        storage_path: &str,
        size_bytes: i64,
        checksum: &str,
    ) -> ServiceResult<File> {
        let mut tx = self.db.begin().await?;
        let id = db::next_id(&mut *tx, FILE_SEQUENCE).await?;

        let file = sqlx::query_as::<_, File>(&format!(
            "INSERT INTO files (id, name, folder_id, visibility, owner_email, group_id,
                                storage_path, content_type, size_bytes, checksum, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.folder_id)
        .bind(input.visibility)
        .bind(&input.owner_email)
        .bind(input.group_id)
        .bind(storage_path)
        .bind(&input.content_type)
        .bind(size_bytes)
        .bind(checksum)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let bumped = sqlx::query("UPDATE folders SET file_count = file_count + 1 WHERE id = ?")
            .bind(input.folder_id)
            .execute(&mut *tx)
            .await?;
        if bumped.rows_affected() == 0 {
            debug!(folder_id = input.folder_id, "uploaded into a folder that does not exist");
        }

        tx.commit().await?;
        Ok(file)
    }

    /// Files in `folder_id` visible to `requester`.
    pub async fn list_in_folder(&self, folder_id: i64, requester: &str) -> ServiceResult<Vec<File>> {
        let groups = self.identities.resolve_groups(requester).await?;
        let mut files = self.in_groups(&groups, Some(folder_id)).await?;
        access::retain_visible(requester, &groups, &mut files);
        debug!(folder_id, requester, count = files.len(), "listed files");
        Ok(files)
    }

    /// Visible files in any folder whose name contains `query`, ignoring case.
    pub async fn search(&self, query: &str, requester: &str) -> ServiceResult<Vec<File>> {
        let groups = self.identities.resolve_groups(requester).await?;
        let mut files = self.in_groups(&groups, None).await?;
        access::retain_visible(requester, &groups, &mut files);
        files.retain(|file| access::name_matches(&file.name, query));
        Ok(files)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<File> {
        sqlx::query_as::<_, File>(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("File not found".into()))
    }

    /// Record plus an open handle on the stored payload.
    ///
    /// No access check is applied; anyone holding the id can download.
    pub async fn open(&self, id: i64) -> ServiceResult<(File, tokio::fs::File)> {
        let file = self.get(id).await?;
        let handle = self.blobs.open(&file.storage_path).await?;
        Ok((file, handle))
    }

    /// Delete a file: remove its blob, decrement the parent folder's count
    /// and drop the record. A blob that is already gone is not an error.
    ///
    /// No ownership check is applied.
    pub async fn delete(&self, id: i64) -> ServiceResult<File> {
        let file = self.get(id).await?;

        if !self.blobs.remove(&file.storage_path).await? {
            debug!(id, "blob for file already missing");
        }

        let mut tx = self.db.begin().await?;
        sqlx::query("UPDATE folders SET file_count = MAX(file_count - 1, 0) WHERE id = ?")
            .bind(file.folder_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id, folder_id = file.folder_id, "deleted file");
        Ok(file)
    }

    /// Files in any of `groups`, optionally restricted to one folder, in id order.
    async fn in_groups(&self, groups: &GroupSet, folder_id: Option<i64>) -> ServiceResult<Vec<File>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {FILE_COLUMNS} FROM files WHERE "));
        if let Some(folder_id) = folder_id {
            builder.push("folder_id = ");
            builder.push_bind(folder_id);
            builder.push(" AND ");
        }
        builder.push("group_id IN (");
        let mut separated = builder.separated(", ");
        for group in groups {
            separated.push_bind(*group);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        Ok(builder
            .build_query_as::<File>()
            .fetch_all(&*self.db)
            .await?)
    }
}
