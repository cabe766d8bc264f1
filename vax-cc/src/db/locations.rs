//! Location queries

use crate::models::{Location, UNKNOWN_LOCATION};
use sqlx::{Row, SqlitePool};
use vax_common::Result;

/// Create a location, returning it
pub async fn create(pool: &SqlitePool, name: &str) -> Result<Location> {
    let result = sqlx::query("INSERT INTO locations (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(Location {
        id: result.last_insert_rowid(),
        name: name.to_string(),
    })
}

/// Look up a location by exact name
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Location>> {
    let row = sqlx::query("SELECT id, name FROM locations WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Location {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

/// All known location names, for fuzzy matching
pub async fn all_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM locations ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}

/// The catch-all "Unknown" location, created on first use
pub async fn get_or_create_unknown(pool: &SqlitePool) -> Result<Location> {
    if let Some(location) = find_by_name(pool, UNKNOWN_LOCATION).await? {
        return Ok(location);
    }
    create(pool, UNKNOWN_LOCATION).await
}
