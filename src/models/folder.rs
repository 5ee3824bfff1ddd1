//! Represents a folder: a named, group-scoped container for files.

use super::GroupScoped;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A folder owned by one identity and scoped to a single group.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Sequential identifier, never reused after deletion.
    pub id: i64,

    pub name: String,

    /// `true` when every member of the group may see the folder.
    pub visibility: bool,

    /// Email of the identity that created the folder.
    pub owner_email: String,

    pub group_id: i64,

    /// Number of files currently filed under this folder.
    pub file_count: i64,

    pub created_at: DateTime<Utc>,
}

impl GroupScoped for Folder {
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
