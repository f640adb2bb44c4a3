//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas and
//! creates the usergroup, view level and membership tables. Every step is
//! idempotent, so opening an existing database runs the same sequence.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Identifier of the seeded root usergroup
pub const ROOT_GROUP_ID: i64 = 1;

/// Title of the seeded root usergroup
pub const ROOT_GROUP_TITLE: &str = "Public";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables on an already-open pool
///
/// Split out from `init_database` so callers with their own pool (tests,
/// embedding applications) get the same schema.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_usergroups_table(pool).await?;
    create_viewlevels_table(pool).await?;
    create_user_usergroup_map_table(pool).await?;
    seed_root_group(pool).await?;
    record_schema_version(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the usergroups table
///
/// `parent_id = 0` marks the root. `lft`/`rgt` are owned by the rebuilder and
/// are `0` until the first rebuild after insert.
async fn create_usergroups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS usergroups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER NOT NULL DEFAULT 0,
            lft INTEGER NOT NULL DEFAULT 0,
            rgt INTEGER NOT NULL DEFAULT 0,
            title TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_usergroup_parent_title_lookup ON usergroups(parent_id, title)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_usergroup_nested_set_lookup ON usergroups(lft, rgt)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the viewlevels table
///
/// `rules` holds a serialized list of usergroup ids such as `[1,6,7]`.
async fn create_viewlevels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS viewlevels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL DEFAULT '' UNIQUE,
            ordering INTEGER NOT NULL DEFAULT 0,
            rules TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_usergroup_map_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_usergroup_map (
            user_id INTEGER NOT NULL,
            group_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, group_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the root usergroup when the table is empty
async fn seed_root_group(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usergroups")
        .fetch_one(pool)
        .await?;

    if count == 0 {
        sqlx::query("INSERT INTO usergroups (id, parent_id, lft, rgt, title) VALUES (?, 0, 0, 1, ?)")
            .bind(ROOT_GROUP_ID)
            .bind(ROOT_GROUP_TITLE)
            .execute(pool)
            .await?;

        info!("Created root usergroup '{}'", ROOT_GROUP_TITLE);
    }

    Ok(())
}

async fn record_schema_version(pool: &SqlitePool) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}
