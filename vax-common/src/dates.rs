//! Date normalization for survey answers
//!
//! VA survey exports carry dates in whatever format the collecting device
//! produced, plus the literal answers "dk" (don't know) and "nan". Everything
//! funnels through [`parse_date`] so downstream consumers only ever see
//! ISO dates or the `"dk"` sentinel.

use crate::{Error, Result};
use chrono::NaiveDate;

/// Answer used throughout the data set for "don't know"
pub const DONT_KNOW: &str = "dk";

/// Candidate formats, tried in order. First match wins.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
];

/// Default output format (ISO calendar date)
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Parse a raw date answer into `return_format`, or the `"dk"` sentinel.
///
/// - `None` (the answer was not a string at all) yields `"dk"`.
/// - Empty strings and case-insensitive `"dk"`/`"nan"` yield `"dk"`.
/// - Each format in `formats` is tried in order with strict calendar
///   parsing; the first success is reformatted with `return_format`.
/// - Strings that fail every format but embed a `<digit>T<digit>` time
///   separator are truncated to the part before the `T`.
/// - Anything else fails with [`Error::Parse`] when `strict`, and is
///   returned unchanged otherwise. The lenient passthrough is deliberate:
///   import must not reject records over one bad answer, the dashboard
///   validator re-runs the strict variant and records an issue instead.
pub fn parse_date(
    raw: Option<&str>,
    formats: &[&str],
    strict: bool,
    return_format: &str,
) -> Result<String> {
    let date_str = match raw {
        Some(s) => s,
        None => return Ok(DONT_KNOW.to_string()),
    };

    if date_str.is_empty() || date_str.eq_ignore_ascii_case("dk") || date_str.eq_ignore_ascii_case("nan") {
        return Ok(DONT_KNOW.to_string());
    }

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, fmt) {
            return Ok(date.format(return_format).to_string());
        }
    }

    // Timestamp-ish strings (e.g. "2021-03-05T14:22:01") that matched no
    // configured format: keep the calendar part before the time separator.
    if let Some(prefix) = split_before_time_separator(date_str) {
        return Ok(prefix.to_string());
    }

    if strict {
        Err(Error::Parse(format!(
            "no valid date format found for date string {date_str}"
        )))
    } else {
        Ok(date_str.to_string())
    }
}

/// Parse with the default format list and ISO output.
pub fn parse_date_default(raw: Option<&str>, strict: bool) -> Result<String> {
    parse_date(raw, DATE_FORMATS, strict, ISO_DATE)
}

/// Find a `<digit>T<digit>` pattern and return the text before the `T`.
fn split_before_time_separator(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    for i in 1..bytes.len().saturating_sub(1) {
        if bytes[i] == b'T' && bytes[i - 1].is_ascii_digit() && bytes[i + 1].is_ascii_digit() {
            return Some(&s[..i]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_dont_know_answers_yield_sentinel() {
        assert_eq!(parse_date_default(Some(""), false).unwrap(), "dk");
        assert_eq!(parse_date_default(Some("dk"), false).unwrap(), "dk");
        assert_eq!(parse_date_default(Some("DK"), false).unwrap(), "dk");
        assert_eq!(parse_date_default(Some("NaN"), false).unwrap(), "dk");
        assert_eq!(parse_date_default(None, true).unwrap(), "dk");
    }

    #[test]
    fn first_matching_format_wins_and_reformats() {
        assert_eq!(parse_date_default(Some("2021-03-05"), true).unwrap(), "2021-03-05");
        assert_eq!(parse_date_default(Some("05/03/2021"), true).unwrap(), "2021-03-05");
        assert_eq!(
            parse_date_default(Some("2021-03-05 14:22:01"), true).unwrap(),
            "2021-03-05"
        );
    }

    #[test]
    fn parse_is_idempotent_on_its_own_output() {
        let once = parse_date_default(Some("05/03/2021"), true).unwrap();
        let twice = parse_date_default(Some(&once), true).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn embedded_time_separator_is_stripped() {
        assert_eq!(
            parse_date_default(Some("2021-03-05T14:22:01"), false).unwrap(),
            "2021-03-05"
        );
    }

    #[test]
    fn invalid_calendar_date_fails_strict_passes_lenient() {
        let err = parse_date_default(Some("2020-13-45"), true);
        assert!(matches!(err, Err(Error::Parse(_))));

        let lenient = parse_date_default(Some("2020-13-45"), false).unwrap();
        assert_eq!(lenient, "2020-13-45");
    }

    #[test]
    fn lenient_passthrough_keeps_garbage_verbatim() {
        assert_eq!(
            parse_date_default(Some("sometime last year"), false).unwrap(),
            "sometime last year"
        );
    }
}
