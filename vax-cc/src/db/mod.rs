//! Database access for vax-cc
//!
//! One shared SQLite database holds the records, locations, field-worker
//! usernames and everything the coding pipeline produces.

pub mod batches;
pub mod causes;
pub mod issues;
pub mod locations;
pub mod usernames;
pub mod verbal_autopsies;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use vax_common::Result;

/// Initialize database connection pool
///
/// Connects to the SQLite file (creating it, and its parent directory,
/// when missing) and creates the vax-cc tables.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests.
///
/// Capped at one connection: every connection to `sqlite::memory:` is its
/// own database, so a larger pool would scatter tables across connections.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Initialize vax-cc tables
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS va_usernames (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            va_username TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verbal_autopsies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fields TEXT NOT NULL DEFAULT '{}',
            username TEXT NOT NULL DEFAULT '',
            age_group TEXT NOT NULL DEFAULT '',
            location_id INTEGER REFERENCES locations(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coding_batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            state TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS causes_of_death (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            verbalautopsy_id INTEGER NOT NULL REFERENCES verbal_autopsies(id),
            cause TEXT NOT NULL,
            algorithm TEXT NOT NULL,
            settings TEXT NOT NULL DEFAULT '',
            coding_batch_id INTEGER REFERENCES coding_batches(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cause_coding_issues (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            verbalautopsy_id INTEGER NOT NULL REFERENCES verbal_autopsies(id),
            text TEXT NOT NULL,
            severity TEXT NOT NULL,
            algorithm TEXT NOT NULL DEFAULT '',
            settings TEXT NOT NULL DEFAULT '',
            coding_batch_id INTEGER REFERENCES coding_batches(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (locations, va_usernames, verbal_autopsies, coding_batches, causes_of_death, cause_coding_issues)"
    );

    Ok(())
}
