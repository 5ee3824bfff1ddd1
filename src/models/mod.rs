//! Core data models for the group-scoped file sharing service.
//!
//! Identities (supervisors and students) decide group membership; resources
//! (folders and files) carry the group, owner and visibility that access
//! checks are evaluated against. Records map to SQLite rows via
//! `sqlx::FromRow` and serialize as camelCase JSON via `serde`.

pub mod file;
pub mod folder;
pub mod identity;

/// Common view of a group-scoped resource used by visibility checks.
pub trait GroupScoped {
    fn group_id(&self) -> i64;
    fn owner_email(&self) -> &str;
    fn is_public(&self) -> bool;
}
