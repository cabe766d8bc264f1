//! Cause-of-death queries

use crate::models::CauseOfDeath;
use sqlx::{Row, SqlitePool};
use vax_common::Result;

/// Bulk-insert coding results, inside the batch's write transaction
pub async fn bulk_create(
    conn: &mut sqlx::SqliteConnection,
    causes: &[CauseOfDeath],
    coding_batch_id: i64,
) -> Result<()> {
    for cause in causes {
        sqlx::query(
            r#"
            INSERT INTO causes_of_death (verbalautopsy_id, cause, algorithm, settings, coding_batch_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(cause.verbalautopsy_id)
        .bind(&cause.cause)
        .bind(&cause.algorithm)
        .bind(&cause.settings)
        .bind(coding_batch_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Total number of persisted causes
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM causes_of_death")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// All causes recorded for one record
pub async fn load_for_va(pool: &SqlitePool, verbalautopsy_id: i64) -> Result<Vec<CauseOfDeath>> {
    let rows = sqlx::query(
        r#"
        SELECT verbalautopsy_id, cause, algorithm, settings
        FROM causes_of_death
        WHERE verbalautopsy_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(verbalautopsy_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| CauseOfDeath {
            verbalautopsy_id: row.get("verbalautopsy_id"),
            cause: row.get("cause"),
            algorithm: row.get("algorithm"),
            settings: row.get("settings"),
        })
        .collect())
}
