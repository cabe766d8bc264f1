//! Coding batch queries

use crate::models::{BatchState, CodingBatch};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use vax_common::Result;

/// Start a new pending batch
pub async fn create(pool: &SqlitePool) -> Result<CodingBatch> {
    let created_at = Utc::now();

    let result = sqlx::query("INSERT INTO coding_batches (state, created_at) VALUES (?, ?)")
        .bind(BatchState::Pending.as_str())
        .bind(created_at.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(CodingBatch {
        id: result.last_insert_rowid(),
        state: BatchState::Pending,
        created_at,
    })
}

/// Mark a batch finished, inside the batch's write transaction
pub async fn mark_finished(conn: &mut sqlx::SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("UPDATE coding_batches SET state = ? WHERE id = ?")
        .bind(BatchState::Finished.as_str())
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Mark a batch failed (best effort, outside any transaction)
pub async fn mark_failed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE coding_batches SET state = ? WHERE id = ?")
        .bind(BatchState::Failed.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Load one batch by id
pub async fn load(pool: &SqlitePool, id: i64) -> Result<Option<CodingBatch>> {
    let row = sqlx::query("SELECT id, state, created_at FROM coding_batches WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let state_str: String = row.get("state");
            let state = BatchState::parse(&state_str).ok_or_else(|| {
                vax_common::Error::Internal(format!("Unknown batch state: {}", state_str))
            })?;

            let created_at: String = row.get("created_at");
            let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| vax_common::Error::Internal(format!("Failed to parse created_at: {}", e)))?
                .with_timezone(&chrono::Utc);

            Ok(Some(CodingBatch {
                id: row.get("id"),
                state,
                created_at,
            }))
        }
        None => Ok(None),
    }
}
