//! Location assignment for records missing one
//!
//! Records name their facility free-hand ("stbrigid hosp.", "St. Brigid
//! Hospital", ...), so assignment fuzzy-matches the answer against the
//! known location names. An answer that matches nothing resolves to the
//! catch-all "Unknown" location so the record still lands somewhere on
//! the map; the dashboard validator reports that as a warning.

use crate::db;
use crate::models::VerbalAutopsy;
use sqlx::SqlitePool;
use vax_common::Result;

/// Survey fields consulted for a facility answer, in order
const FACILITY_FIELDS: &[&str] = &["hospital", "hospital_other"];

/// Minimum normalized similarity for a facility answer to count as a match
const MATCH_THRESHOLD: f64 = 0.75;

/// Best fuzzy match for `value` among `candidates`, if any clears
/// `threshold` (normalized Levenshtein similarity, case-insensitive).
pub fn fuzzy_match(value: &str, candidates: &[String], threshold: f64) -> Option<String> {
    let needle = value.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut best: Option<(f64, &String)> = None;
    for candidate in candidates {
        let score = strsim::normalized_levenshtein(&needle, &candidate.to_lowercase());
        if score >= threshold && best.map_or(true, |(s, _)| score > s) {
            best = Some((score, candidate));
        }
    }

    best.map(|(_, name)| name.clone())
}

/// Try to derive a location for a record from its facility answer.
///
/// Mutates the in-memory record only; persistence is the caller's call.
/// Leaves the location untouched when one is already set or no facility
/// answer is present.
pub async fn assign_va_location(va: &mut VerbalAutopsy, pool: &SqlitePool) -> Result<()> {
    if va.location.is_some() {
        return Ok(());
    }

    let answer = FACILITY_FIELDS
        .iter()
        .filter_map(|field| va.field_str(field))
        .find(|value| !value.trim().is_empty());

    let answer = match answer {
        Some(answer) => answer.to_string(),
        None => return Ok(()),
    };

    let known_names = db::locations::all_names(pool).await?;

    if let Some(name) = fuzzy_match(&answer, &known_names, MATCH_THRESHOLD) {
        va.location = db::locations::find_by_name(pool, &name).await?;
        tracing::debug!(va_id = va.id, facility = %answer, matched = %name, "Assigned location");
    } else {
        // A facility was named but matched nothing we know of
        va.location = Some(db::locations::get_or_create_unknown(pool).await?);
        tracing::debug!(va_id = va.id, facility = %answer, "No facility match; assigned Unknown");
    }

    Ok(())
}
