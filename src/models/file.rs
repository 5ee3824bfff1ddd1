//! Represents an uploaded file stored inside a folder.

use super::GroupScoped;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for a stored file. The payload itself lives on disk under
/// `storage_path`, relative to the configured storage directory.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Sequential identifier, never reused after deletion.
    pub id: i64,

    /// Logical name shown to users and used for downloads.
    pub name: String,

    /// Parent folder. Not enforced as a foreign key: deleting a folder
    /// leaves its files in place.
    pub folder_id: i64,

    pub visibility: bool,

    pub owner_email: String,

    pub group_id: i64,

    /// Stored blob name inside the storage directory.
    pub storage_path: String,

    /// Content type reported by the uploader, if any.
    pub content_type: Option<String>,

    pub size_bytes: i64,

    /// Hex-encoded MD5 of the stored bytes.
    pub checksum: String,

    pub created_at: DateTime<Utc>,
}

impl GroupScoped for File {
    fn group_id(&self) -> i64 {
        self.group_id
    }

    fn owner_email(&self) -> &str {
        &self.owner_email
    }

    fn is_public(&self) -> bool {
        self.visibility
    }
}
