//! Domain entities for the cause-coding service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Algorithm name recorded on causes/issues produced by InterVA5 coding
pub const INTERVA_ALGORITHM: &str = "InterVA5";

/// Algorithm sentinel for issues produced by the dashboard validator
pub const DASHBOARD_ALGORITHM: &str = "";

/// Survey field holding the date of death
pub const DATE_OF_DEATH_FIELD: &str = "Id10023";

/// Name of the catch-all location for unmatched facility answers
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// A geographic location a record can be assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
}

/// One verbal autopsy interview record.
///
/// Survey answers are an open-ended set of named fields (the form has
/// hundreds of questions and changes between instrument revisions), stored
/// as one JSON object. A handful of fields the pipelines care about get
/// typed accessors below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerbalAutopsy {
    pub id: i64,
    pub fields: Map<String, Value>,
    /// Field worker identifier; may be empty
    pub username: String,
    pub age_group: String,
    pub location: Option<Location>,
}

impl VerbalAutopsy {
    /// String view of a survey answer. Numeric answers are not stringified;
    /// callers that accept numbers use the dedicated accessors.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        self.fields
            .insert(name.to_string(), Value::String(value.to_string()));
    }

    /// Date-of-death answer, raw
    pub fn date_of_death(&self) -> Option<&str> {
        self.field_str(DATE_OF_DEATH_FIELD)
    }

    /// `ageInYears` converted to a whole number of years, if the answer is
    /// numeric at all (fractional ages are truncated, matching how the
    /// collecting instruments report them)
    pub fn age_in_years(&self) -> Option<i64> {
        let value = self.fields.get("ageInYears")?;
        let age = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if age.is_finite() {
            Some(age as i64)
        } else {
            None
        }
    }

    /// True when a life-stage indicator field (`isAdult1` etc.) is set
    pub fn field_truthy(&self, name: &str) -> bool {
        match self.fields.get(name) {
            Some(Value::Number(n)) => n.as_f64() == Some(1.0),
            Some(Value::String(s)) => {
                let s = s.trim();
                s == "1" || s == "1.0"
            }
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }
}

/// Issue severity, matching the algorithm service's own categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// All severities, in the order the response arrays are read
pub const SEVERITIES: &[Severity] = &[Severity::Error, Severity::Warning];

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    /// Key of the corresponding issue array in the algorithm response
    pub fn response_key(&self) -> &'static str {
        match self {
            Severity::Error => "errors",
            Severity::Warning => "warnings",
        }
    }

    pub fn parse(s: &str) -> Option<Severity> {
        match s {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            _ => None,
        }
    }
}

/// Lifecycle of one coding run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Pending,
    Finished,
    Failed,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Pending => "pending",
            BatchState::Finished => "finished",
            BatchState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<BatchState> {
        match s {
            "pending" => Some(BatchState::Pending),
            "finished" => Some(BatchState::Finished),
            "failed" => Some(BatchState::Failed),
            _ => None,
        }
    }
}

/// One run of the coding pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingBatch {
    pub id: i64,
    pub state: BatchState,
    pub created_at: DateTime<Utc>,
}

/// One coding result for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseOfDeath {
    pub verbalautopsy_id: i64,
    pub cause: String,
    pub algorithm: String,
    /// Settings snapshot (JSON text) the coding ran with
    pub settings: String,
}

/// One coding or validation diagnostic for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseCodingIssue {
    pub verbalautopsy_id: i64,
    pub text: String,
    pub severity: Severity,
    /// Producing algorithm; empty string marks the dashboard validator
    pub algorithm: String,
    pub settings: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn va_with(fields: Value) -> VerbalAutopsy {
        VerbalAutopsy {
            id: 1,
            fields: fields.as_object().unwrap().clone(),
            username: String::new(),
            age_group: String::new(),
            location: None,
        }
    }

    #[test]
    fn age_in_years_accepts_numbers_and_numeric_strings() {
        assert_eq!(va_with(json!({"ageInYears": "64"})).age_in_years(), Some(64));
        assert_eq!(va_with(json!({"ageInYears": 64.7})).age_in_years(), Some(64));
        assert_eq!(va_with(json!({"ageInYears": "25.7"})).age_in_years(), Some(25));
        assert_eq!(va_with(json!({"ageInYears": "dk"})).age_in_years(), None);
        assert_eq!(va_with(json!({})).age_in_years(), None);
    }

    #[test]
    fn life_stage_indicators_accept_mixed_encodings() {
        assert!(va_with(json!({"isAdult1": 1})).field_truthy("isAdult1"));
        assert!(va_with(json!({"isAdult1": "1"})).field_truthy("isAdult1"));
        assert!(va_with(json!({"isAdult1": "1.0"})).field_truthy("isAdult1"));
        assert!(!va_with(json!({"isAdult1": 0})).field_truthy("isAdult1"));
        assert!(!va_with(json!({"isAdult1": ""})).field_truthy("isAdult1"));
        assert!(!va_with(json!({})).field_truthy("isAdult1"));
    }

    #[test]
    fn severity_response_keys_are_pluralized() {
        assert_eq!(Severity::Error.response_key(), "errors");
        assert_eq!(Severity::Warning.response_key(), "warnings");
    }
}
