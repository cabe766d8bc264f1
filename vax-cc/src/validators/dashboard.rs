//! Dashboard readiness validation
//!
//! Decides whether a record carries enough data to appear on the
//! dashboard, reporting shortfalls as CauseCodingIssue rows for the data
//! manager. Runs after records are loaded and after a record is edited or
//! reset. Independent of the coding pipeline; its issues carry the
//! empty-string algorithm sentinel, and re-validation replaces them
//! wholesale (delete then reinsert) so fixed problems disappear.

use crate::db;
use crate::models::{
    CauseCodingIssue, Severity, VerbalAutopsy, DASHBOARD_ALGORITHM, DATE_OF_DEATH_FIELD,
    UNKNOWN_LOCATION,
};
use crate::services::location_assignment::assign_va_location;
use sqlx::SqlitePool;
use vax_common::dates::parse_date_default;
use vax_common::Result;

/// Age-group answers that satisfy the demographics filters directly
const AGE_GROUPS: &[&str] = &["adult", "neonate", "child"];

/// Life-stage indicator fields that can stand in for an age group
const LIFE_STAGE_FIELDS: &[&str] = &["isNeonatal1", "isChild1", "isAdult1"];

/// Run the five dashboard checks over every record.
///
/// Each check is independent; a record can collect several issues. Date
/// parsing normalizes the in-memory `Id10023` answer on success, and the
/// normalized fields plus any derived location are persisted alongside
/// the issues in one transaction at the end.
pub async fn validate_vas_for_dashboard(
    pool: &SqlitePool,
    verbal_autopsies: &mut [VerbalAutopsy],
) -> Result<Vec<CauseCodingIssue>> {
    let mut issues = Vec::new();

    for va in verbal_autopsies.iter_mut() {
        // Date of death: required for the dashboard time-frame filters.
        // The form guarantees either "dk" or a real date, so anything
        // unparsable is an error worth a data manager's attention.
        match parse_date_default(va.date_of_death(), true) {
            Ok(normalized) => va.set_field(DATE_OF_DEATH_FIELD, &normalized),
            Err(_) => {
                let raw = va.date_of_death().unwrap_or_default();
                issues.push(issue(
                    va.id,
                    format!("Error: field Id10023, couldn't parse date from {raw}"),
                    Severity::Error,
                ));
            }
        }

        // ageInYears: required for mean age of death
        if va.age_in_years().is_none() {
            issues.push(issue(
                va.id,
                "Warning: field ageInYears, age was not provided or not a number.".to_string(),
                Severity::Warning,
            ));
        }

        // Age group, derivable from several fields; required for the
        // demographics filters
        let age_group_known = AGE_GROUPS.contains(&va.age_group.as_str());
        let life_stage_known = LIFE_STAGE_FIELDS.iter().any(|field| va.field_truthy(field));
        if !age_group_known && !life_stage_known && va.age_in_years().is_none() {
            issues.push(issue(
                va.id,
                "Warning: field age_group, no relevant data was found in fields; age_group, \
                 isNeonatal1, isChild1, isAdult1, or ageInYears."
                    .to_string(),
                Severity::Warning,
            ));
        }

        // Username associates the record with a field worker
        if va.username.is_empty() {
            issues.push(issue(
                va.id,
                "Warning: field username, the va record does not have an assigned username."
                    .to_string(),
                Severity::Warning,
            ));
        } else if !db::usernames::exists(pool, &va.username).await? {
            issues.push(issue(
                va.id,
                "Warning: field username, the username provided is not a known Field Worker."
                    .to_string(),
                Severity::Warning,
            ));
        }

        // Location puts the record on the map
        if va.location.is_none() {
            assign_va_location(va, pool).await?;

            if va.location.is_none() {
                issues.push(issue(
                    va.id,
                    "ERROR: no location provided (or none detected)".to_string(),
                    Severity::Error,
                ));
            }
        }

        if let Some(location) = &va.location {
            if location.name == UNKNOWN_LOCATION {
                issues.push(issue(
                    va.id,
                    "Warning: location field (parsed from hospital): provided location was not \
                     a known facility. Set location to 'Unknown'"
                        .to_string(),
                    Severity::Warning,
                ));
            }
        }
    }

    // Replace prior dashboard issues and persist the normalized fields in
    // one shot, so a failure mid-validation never strips a record's issues
    // without re-adding them.
    let mut tx = pool.begin().await?;
    for va in verbal_autopsies.iter() {
        db::issues::delete_dashboard_issues(&mut tx, va.id).await?;
        db::verbal_autopsies::save_fields(&mut tx, va.id, &va.fields).await?;
        db::verbal_autopsies::save_location(&mut tx, va.id, va.location.as_ref().map(|l| l.id))
            .await?;
    }
    db::issues::bulk_create(&mut tx, &issues, None).await?;
    tx.commit().await?;

    tracing::info!(
        records = verbal_autopsies.len(),
        issues = issues.len(),
        "Dashboard validation complete"
    );

    Ok(issues)
}

fn issue(verbalautopsy_id: i64, text: String, severity: Severity) -> CauseCodingIssue {
    CauseCodingIssue {
        verbalautopsy_id,
        text,
        severity,
        algorithm: DASHBOARD_ALGORITHM.to_string(),
        settings: String::new(),
    }
}
