//! Cause-coding issue queries

use crate::models::{CauseCodingIssue, Severity, DASHBOARD_ALGORITHM};
use sqlx::{Row, SqlitePool};
use vax_common::Result;

/// Bulk-insert issues, inside the caller's write transaction.
///
/// `coding_batch_id` is set for issues reported by a coding algorithm and
/// `None` for dashboard-validator issues, which have no owning batch.
pub async fn bulk_create(
    conn: &mut sqlx::SqliteConnection,
    issues: &[CauseCodingIssue],
    coding_batch_id: Option<i64>,
) -> Result<()> {
    for issue in issues {
        sqlx::query(
            r#"
            INSERT INTO cause_coding_issues (verbalautopsy_id, text, severity, algorithm, settings, coding_batch_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(issue.verbalautopsy_id)
        .bind(&issue.text)
        .bind(issue.severity.as_str())
        .bind(&issue.algorithm)
        .bind(&issue.settings)
        .bind(coding_batch_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Drop a record's dashboard-validator issues ahead of re-validation.
/// Coding-algorithm issues are left alone; those only go away with their
/// owning batch.
pub async fn delete_dashboard_issues(
    conn: &mut sqlx::SqliteConnection,
    verbalautopsy_id: i64,
) -> Result<()> {
    sqlx::query("DELETE FROM cause_coding_issues WHERE verbalautopsy_id = ? AND algorithm = ?")
        .bind(verbalautopsy_id)
        .bind(DASHBOARD_ALGORITHM)
        .execute(conn)
        .await?;

    Ok(())
}

/// All issues recorded for one record
pub async fn load_for_va(pool: &SqlitePool, verbalautopsy_id: i64) -> Result<Vec<CauseCodingIssue>> {
    let rows = sqlx::query(
        r#"
        SELECT verbalautopsy_id, text, severity, algorithm, settings
        FROM cause_coding_issues
        WHERE verbalautopsy_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(verbalautopsy_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let severity_str: String = row.get("severity");
            let severity = Severity::parse(&severity_str).ok_or_else(|| {
                vax_common::Error::Internal(format!("Unknown severity: {}", severity_str))
            })?;

            Ok(CauseCodingIssue {
                verbalautopsy_id: row.get("verbalautopsy_id"),
                text: row.get("text"),
                severity,
                algorithm: row.get("algorithm"),
                settings: row.get("settings"),
            })
        })
        .collect()
}

/// Total number of persisted issues
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cause_coding_issues")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
