//! Algorithm response parsing
//!
//! Walks the decoded InterVA5 response in two independent passes — one for
//! per-record coding results, one for the per-severity issue arrays — and
//! correlates every entry back to its source record through the row-index
//! identifier that round-tripped both services. Both passes accumulate
//! fully in memory; the coordinator persists them in one transaction, so a
//! parse failure partway through can never leave a partial write behind.
//!
//! The upstream serializer wraps R vectors, so every field may arrive as a
//! JSON scalar or a one-element array; [`scalar`] handles both.

use crate::error::{CodingError, ServiceHop};
use crate::models::{CauseCodingIssue, CauseOfDeath, VerbalAutopsy, SEVERITIES};
use serde_json::Value;

/// Cause label recorded when the algorithm could not discriminate
pub const INDETERMINATE: &str = "Indeterminate";

/// Extract one CauseOfDeath per coded entry of `results.VA5`.
///
/// An entry with empty `CAUSE1`, `INDET == 100` and empty `LIK1` is the
/// algorithm's indeterminate signal and is coerced to the
/// `"Indeterminate"` label. An entry with an empty cause and no such
/// signal produces no Cause; the upstream emits these routinely, so it is
/// logged rather than failed.
pub fn parse_causes(
    response: &Value,
    verbal_autopsies: &[VerbalAutopsy],
    algorithm: &str,
    settings_snapshot: &str,
) -> Result<Vec<CauseOfDeath>, CodingError> {
    let results = response
        .pointer("/results/VA5")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing results.VA5 array"))?;

    let mut causes = Vec::new();
    for entry in results {
        let mut cause = scalar_str(entry, "CAUSE1")?.trim().to_string();

        // Indeterminate cause of death: CAUSE1 == "", LIK1 == "", INDET == 100
        if cause.is_empty()
            && scalar_num(entry, "INDET")? == 100.0
            && scalar_str(entry, "LIK1")?.trim().is_empty()
        {
            cause = INDETERMINATE.to_string();
        }

        if cause.is_empty() {
            let id = scalar_str(entry, "ID").unwrap_or_default();
            tracing::warn!(
                response_id = %id,
                "Result entry has no cause and no indeterminacy signal; dropping"
            );
            continue;
        }

        let offset_token = scalar_str(entry, "ID")?.trim().to_string();
        let va = resolve_offset(&offset_token, verbal_autopsies)?;

        causes.push(CauseOfDeath {
            verbalautopsy_id: va.id,
            cause,
            algorithm: algorithm.to_string(),
            settings: settings_snapshot.to_string(),
        });
    }

    Ok(causes)
}

/// Extract one CauseCodingIssue per entry of the per-severity arrays
/// (`errors`, `warnings`). Entries arrive as bare strings or one-element
/// arrays of the form `"<offset>  <message>"`, offset and message split by
/// the first run of two or more spaces.
pub fn parse_issues(
    response: &Value,
    verbal_autopsies: &[VerbalAutopsy],
    algorithm: &str,
    settings_snapshot: &str,
) -> Result<Vec<CauseCodingIssue>, CodingError> {
    let mut issues = Vec::new();

    for &severity in SEVERITIES {
        let entries = response
            .get(severity.response_key())
            .and_then(Value::as_array)
            .ok_or_else(|| malformed(format!("missing {} array", severity.response_key())))?;

        for entry in entries {
            let text = scalar(entry).as_str().ok_or_else(|| {
                malformed(format!("non-string entry in {}", severity.response_key()))
            })?;

            let (offset_token, message) = split_issue(text).ok_or_else(|| {
                malformed(format!(
                    "issue entry without offset separator: {text:?}"
                ))
            })?;

            let va = resolve_offset(offset_token.trim(), verbal_autopsies)?;

            issues.push(CauseCodingIssue {
                verbalautopsy_id: va.id,
                text: message.to_string(),
                severity,
                algorithm: algorithm.to_string(),
                settings: settings_snapshot.to_string(),
            });
        }
    }

    Ok(issues)
}

/// Resolve a round-tripped row-index identifier to its source record.
/// An identifier that does not resolve means the client and service have
/// desynchronized; misattributing a cause would be a data-integrity
/// failure, so this fails the batch loudly.
fn resolve_offset<'a>(
    token: &str,
    verbal_autopsies: &'a [VerbalAutopsy],
) -> Result<&'a VerbalAutopsy, CodingError> {
    token
        .parse::<usize>()
        .ok()
        .and_then(|offset| verbal_autopsies.get(offset))
        .ok_or_else(|| CodingError::Correlation {
            offset: token.to_string(),
            record_count: verbal_autopsies.len(),
        })
}

/// Split an issue entry on the first run of two-or-more spaces
fn split_issue(entry: &str) -> Option<(&str, &str)> {
    let start = entry.find("  ")?;
    let rest = &entry[start..];
    let message_start = start + rest.len() - rest.trim_start_matches(' ').len();
    Some((&entry[..start], &entry[message_start..]))
}

/// Unwrap the upstream's one-element-array vector encoding
fn scalar(value: &Value) -> &Value {
    match value {
        Value::Array(items) if !items.is_empty() => &items[0],
        other => other,
    }
}

fn scalar_str<'a>(entry: &'a Value, key: &str) -> Result<&'a str, CodingError> {
    entry
        .get(key)
        .map(scalar)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(format!("missing or non-string field {key}")))
}

fn scalar_num(entry: &Value, key: &str) -> Result<f64, CodingError> {
    let value = entry
        .get(key)
        .map(scalar)
        .ok_or_else(|| malformed(format!("missing field {key}")))?;

    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| malformed(format!("non-finite field {key}"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| malformed(format!("non-numeric field {key}"))),
        _ => Err(malformed(format!("non-numeric field {key}"))),
    }
}

fn malformed(detail: impl Into<String>) -> CodingError {
    CodingError::service(ServiceHop::Algorithm, detail.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use serde_json::json;

    fn vas(ids: &[i64]) -> Vec<VerbalAutopsy> {
        ids.iter()
            .map(|&id| VerbalAutopsy {
                id,
                fields: serde_json::Map::new(),
                username: String::new(),
                age_group: String::new(),
                location: None,
            })
            .collect()
    }

    fn result_entry(id: &str, cause: &str, lik1: &str, indet: i64) -> Value {
        json!({
            "ID": [id],
            "CAUSE1": [cause],
            "LIK1": [lik1],
            "INDET": [indet],
        })
    }

    fn response_with_results(entries: Vec<Value>) -> Value {
        json!({
            "results": { "VA5": entries },
            "errors": [],
            "warnings": [],
        })
    }

    #[test]
    fn permuted_offsets_map_each_cause_to_its_own_record() {
        let records = vas(&[100, 200, 300]);
        let response = response_with_results(vec![
            result_entry("2", "Stroke", "61", 0),
            result_entry("0", "Sepsis", "48", 0),
            result_entry("1", "HIV/AIDS related death", "90", 0),
        ]);

        let causes = parse_causes(&response, &records, "InterVA5", "{}").unwrap();

        assert_eq!(causes.len(), 3);
        assert_eq!(causes[0].verbalautopsy_id, 300);
        assert_eq!(causes[0].cause, "Stroke");
        assert_eq!(causes[1].verbalautopsy_id, 100);
        assert_eq!(causes[1].cause, "Sepsis");
        assert_eq!(causes[2].verbalautopsy_id, 200);
        assert_eq!(causes[2].cause, "HIV/AIDS related death");
    }

    #[test]
    fn indeterminate_signal_is_coerced_to_a_label() {
        let records = vas(&[100]);
        let response = response_with_results(vec![result_entry("0", "", "", 100)]);

        let causes = parse_causes(&response, &records, "InterVA5", "{}").unwrap();

        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].cause, INDETERMINATE);
        assert_eq!(causes[0].verbalautopsy_id, 100);
    }

    #[test]
    fn empty_cause_without_indeterminacy_yields_no_cause() {
        let records = vas(&[100]);
        let response = response_with_results(vec![result_entry("0", "", "12", 0)]);

        let causes = parse_causes(&response, &records, "InterVA5", "{}").unwrap();
        assert!(causes.is_empty());
    }

    #[test]
    fn cause_codes_are_trimmed() {
        let records = vas(&[100]);
        let response = response_with_results(vec![result_entry("0", " Stroke ", "61", 0)]);

        let causes = parse_causes(&response, &records, "InterVA5", "{}").unwrap();
        assert_eq!(causes[0].cause, "Stroke");
    }

    #[test]
    fn unknown_offset_is_a_correlation_error() {
        let records = vas(&[100]);
        let response = response_with_results(vec![result_entry("7", "Stroke", "61", 0)]);

        let err = parse_causes(&response, &records, "InterVA5", "{}").unwrap_err();
        match err {
            CodingError::Correlation { offset, record_count } => {
                assert_eq!(offset, "7");
                assert_eq!(record_count, 1);
            }
            other => panic!("expected correlation error, got {other:?}"),
        }
    }

    #[test]
    fn scalar_fields_work_without_the_array_wrapping() {
        let records = vas(&[100]);
        let response = json!({
            "results": { "VA5": [{"ID": "0", "CAUSE1": "Stroke", "LIK1": "61", "INDET": 0}] },
            "errors": [],
            "warnings": [],
        });

        let causes = parse_causes(&response, &records, "InterVA5", "{}").unwrap();
        assert_eq!(causes[0].cause, "Stroke");
    }

    #[test]
    fn issues_split_on_the_first_run_of_spaces() {
        let records = vas(&[100, 200]);
        let response = json!({
            "results": { "VA5": [] },
            "errors": ["1   field Id10024: date is in the future"],
            "warnings": [["0  unusual symptom  combination reported"]],
        });

        let issues = parse_issues(&response, &records, "InterVA5", "{}").unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].verbalautopsy_id, 200);
        assert_eq!(issues[0].text, "field Id10024: date is in the future");
        assert_eq!(issues[1].severity, Severity::Warning);
        assert_eq!(issues[1].verbalautopsy_id, 100);
        assert_eq!(issues[1].text, "unusual symptom  combination reported");
    }

    #[test]
    fn issue_with_unknown_offset_is_a_correlation_error() {
        let records = vas(&[100]);
        let response = json!({
            "results": { "VA5": [] },
            "errors": ["9  message for a record we never sent"],
            "warnings": [],
        });

        let err = parse_issues(&response, &records, "InterVA5", "{}").unwrap_err();
        assert!(matches!(err, CodingError::Correlation { .. }));
    }

    #[test]
    fn missing_issue_arrays_are_a_malformed_response() {
        let records = vas(&[100]);
        let response = json!({ "results": { "VA5": [] }, "errors": [] });

        let err = parse_issues(&response, &records, "InterVA5", "{}").unwrap_err();
        assert!(matches!(err, CodingError::Service { hop: ServiceHop::Algorithm, .. }));
    }
}
