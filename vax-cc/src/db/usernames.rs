//! Field-worker username queries

use sqlx::SqlitePool;
use vax_common::Result;

/// Register a known field-worker username
pub async fn create(pool: &SqlitePool, va_username: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO va_usernames (va_username) VALUES (?)")
        .bind(va_username)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Whether a username belongs to a known field worker
pub async fn exists(pool: &SqlitePool, va_username: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM va_usernames WHERE va_username = ?")
            .bind(va_username)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}
