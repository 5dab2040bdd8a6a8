//! Database access for the Atelier engine
//!
//! The primary store is an SQLite database under the data directory;
//! each storage branch is a separate SQLite database under
//! `<data_dir>/branches/`. All stores share the same schema.

pub mod blueprints;
pub mod projects;
pub mod search;

use atelier_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Primary database file name within the data directory
pub const PRIMARY_DB_FILE: &str = "atelier.db";

/// Initialize the primary database connection pool
///
/// Creates the data directory and schema on first use.
pub async fn init_primary_pool(data_dir: &Path) -> Result<SqlitePool> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = data_dir.join(PRIMARY_DB_FILE);
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to primary database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_schema(&pool).await?;

    Ok(pool)
}

/// Open a branch database for writing, creating file and schema lazily
pub async fn open_branch_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;
    init_schema(&pool).await?;

    Ok(pool)
}

/// Open an existing branch database for reading
///
/// Fails when the branch file does not exist; callers treat that as
/// "slot not yet produced" rather than an error. mode=rw prevents
/// SQLite from silently creating an empty database on a read path.
pub async fn open_branch_existing(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(atelier_common::Error::NotFound(format!(
            "branch database missing: {}",
            db_path.display()
        )));
    }

    let db_url = format!("sqlite://{}?mode=rw", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;
    Ok(pool)
}

/// Create tables if they don't exist
///
/// Branch databases only ever hold the blueprints/analyses subtree for
/// one slot, but sharing one schema keeps store handles interchangeable.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            brief TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blueprints (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            pros TEXT NOT NULL DEFAULT '[]',
            cons TEXT NOT NULL DEFAULT '[]',
            diagram TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            blueprint_id TEXT NOT NULL,
            category TEXT NOT NULL,
            finding TEXT NOT NULL,
            severity INTEGER NOT NULL,
            persona TEXT NOT NULL,
            embedding TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::debug!("Database schema initialized (projects, blueprints, analyses)");

    Ok(())
}
