//! SQLite pool setup, schema application, and id sequences.

use anyhow::Result;
use sqlx::{
    Executor, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{fs, str::FromStr};

/// Schema applied at startup and by `--migrate`. Every statement is
/// idempotent so it can run against an existing database.
const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

pub const FOLDER_SEQUENCE: &str = "folders";
pub const FILE_SEQUENCE: &str = "files";

/// Open a pool for `database_url`, creating the database file and its
/// parent directory when missing.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    if !in_memory {
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    // An in-memory database lives and dies with its connection, so keep
    // exactly one open for the lifetime of the pool.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    Ok(pool_options.connect_with(options).await?)
}

/// Apply the embedded schema statement by statement.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    let statements = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

/// Draw the next value from a named sequence.
///
/// The increment and read happen in one statement, so concurrent callers
/// never receive the same id and deleted ids are never handed out again.
pub(crate) async fn next_id<'e, E>(executor: E, sequence: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>(
        "UPDATE sequences SET value = value + 1 WHERE name = ? RETURNING value",
    )
    .bind(sequence)
    .fetch_one(executor)
    .await
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = connect("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
