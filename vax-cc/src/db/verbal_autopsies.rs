//! Verbal autopsy record queries

use crate::models::{Location, VerbalAutopsy};
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use vax_common::Result;

/// Create a record (import path and test fixtures)
pub async fn create(
    pool: &SqlitePool,
    fields: &Map<String, Value>,
    username: &str,
    age_group: &str,
    location_id: Option<i64>,
) -> Result<i64> {
    let fields_json = serde_json::to_string(fields)
        .map_err(|e| vax_common::Error::Internal(format!("Failed to serialize fields: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO verbal_autopsies (fields, username, age_group, location_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&fields_json)
    .bind(username)
    .bind(age_group)
    .bind(location_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load every record with no cause coding, ordered by primary key.
///
/// The ordering is load-bearing: the coding pipeline tags each outbound
/// row with its position in this list and resolves response identifiers
/// against the same list, so it must be stable between runs of one batch.
pub async fn load_uncoded(pool: &SqlitePool) -> Result<Vec<VerbalAutopsy>> {
    let rows = sqlx::query(
        r#"
        SELECT va.id, va.fields, va.username, va.age_group, l.id AS loc_id, l.name AS loc_name
        FROM verbal_autopsies va
        LEFT JOIN locations l ON l.id = va.location_id
        LEFT JOIN causes_of_death c ON c.verbalautopsy_id = va.id
        WHERE c.id IS NULL
        ORDER BY va.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(decode_row).collect()
}

/// Load every record, ordered by primary key
pub async fn load_all(pool: &SqlitePool) -> Result<Vec<VerbalAutopsy>> {
    let rows = sqlx::query(
        r#"
        SELECT va.id, va.fields, va.username, va.age_group, l.id AS loc_id, l.name AS loc_name
        FROM verbal_autopsies va
        LEFT JOIN locations l ON l.id = va.location_id
        ORDER BY va.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(decode_row).collect()
}

/// Load one record by id
pub async fn load(pool: &SqlitePool, id: i64) -> Result<Option<VerbalAutopsy>> {
    let row = sqlx::query(
        r#"
        SELECT va.id, va.fields, va.username, va.age_group, l.id AS loc_id, l.name AS loc_name
        FROM verbal_autopsies va
        LEFT JOIN locations l ON l.id = va.location_id
        WHERE va.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(decode_row).transpose()
}

/// Persist a record's (possibly normalized) survey fields
pub async fn save_fields(
    conn: &mut sqlx::SqliteConnection,
    id: i64,
    fields: &Map<String, Value>,
) -> Result<()> {
    let fields_json = serde_json::to_string(fields)
        .map_err(|e| vax_common::Error::Internal(format!("Failed to serialize fields: {}", e)))?;

    sqlx::query("UPDATE verbal_autopsies SET fields = ? WHERE id = ?")
        .bind(&fields_json)
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Persist a record's location assignment
pub async fn save_location(
    conn: &mut sqlx::SqliteConnection,
    id: i64,
    location_id: Option<i64>,
) -> Result<()> {
    sqlx::query("UPDATE verbal_autopsies SET location_id = ? WHERE id = ?")
        .bind(location_id)
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<VerbalAutopsy> {
    let fields_json: String = row.get("fields");
    let fields: Map<String, Value> = serde_json::from_str(&fields_json)
        .map_err(|e| vax_common::Error::Internal(format!("Failed to deserialize fields: {}", e)))?;

    let loc_id: Option<i64> = row.get("loc_id");
    let loc_name: Option<String> = row.get("loc_name");
    let location = match (loc_id, loc_name) {
        (Some(id), Some(name)) => Some(Location { id, name }),
        _ => None,
    };

    Ok(VerbalAutopsy {
        id: row.get("id"),
        fields,
        username: row.get("username"),
        age_group: row.get("age_group"),
        location,
    })
}
