//! Runtime configuration for the coding pipeline
//!
//! Endpoint hosts and InterVA5 parameters come from the environment,
//! validated once at startup. The pipeline refuses to run with settings
//! outside the algorithm's documented value sets rather than silently
//! coding with them, since every Cause/Issue row snapshots the settings
//! for reproducibility.

use crate::error::CodingError;
use serde::{Deserialize, Serialize};

/// Default pyCrossVA transform service host
pub const DEFAULT_PYCROSS_HOST: &str = "http://127.0.0.1:5001";

/// Default InterVA5 algorithm service host
pub const DEFAULT_INTERVA_HOST: &str = "http://127.0.0.1:5002";

/// Allowed prevalence classes for the HIV and Malaria parameters
const PREVALENCE_CLASSES: &[&str] = &["h", "l", "v"];

/// Allowed values for the group-code flag
const GROUPCODE_VALUES: &[&str] = &["True", "False"];

/// InterVA5 parameters, serialized verbatim into the algorithm payload
/// and into every Cause/Issue settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmSettings {
    /// Prevalence of HIV: "h"(igh), "l"(ow) or "v"(ery low)
    #[serde(rename = "HIV")]
    pub hiv: String,
    /// Prevalence of Malaria: "h"(igh), "l"(ow) or "v"(ery low)
    #[serde(rename = "Malaria")]
    pub malaria: String,
    /// Whether to include the group code in the output causes
    pub groupcode: String,
    /// Always "True" when calling InterVA5 over its API
    pub api: String,
}

impl AlgorithmSettings {
    /// Read settings from `INTERVA_HIV`, `INTERVA_MALARIA` and
    /// `INTERVA_GROUPCODE`, with the service's usual defaults.
    pub fn from_env() -> Self {
        Self {
            hiv: std::env::var("INTERVA_HIV").unwrap_or_else(|_| "h".to_string()),
            malaria: std::env::var("INTERVA_MALARIA").unwrap_or_else(|_| "l".to_string()),
            groupcode: std::env::var("INTERVA_GROUPCODE").unwrap_or_else(|_| "True".to_string()),
            api: "True".to_string(),
        }
    }

    /// Check every parameter against its allowed value set.
    pub fn validate(&self) -> Result<(), CodingError> {
        check_option("HIV", &self.hiv, PREVALENCE_CLASSES)?;
        check_option("Malaria", &self.malaria, PREVALENCE_CLASSES)?;
        check_option("groupcode", &self.groupcode, GROUPCODE_VALUES)?;
        check_option("api", &self.api, &["True"])?;
        Ok(())
    }

    /// JSON snapshot recorded on every produced Cause/Issue
    pub fn snapshot(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn check_option(key: &str, value: &str, allowed: &[&str]) -> Result<(), CodingError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(CodingError::Config(format!(
            "provided {key} value {value} not found. Expecting one of {allowed:?}"
        )))
    }
}

/// Full pipeline configuration: both endpoint hosts plus algorithm settings
#[derive(Debug, Clone)]
pub struct CodingConfig {
    pub pycross_host: String,
    pub interva_host: String,
    pub settings: AlgorithmSettings,
}

impl CodingConfig {
    /// Read hosts from `PYCROSS_HOST`/`INTERVA_HOST` (loopback defaults)
    /// and settings from their environment variables. Does not validate;
    /// callers run [`AlgorithmSettings::validate`] at startup.
    pub fn from_env() -> Self {
        Self {
            pycross_host: std::env::var("PYCROSS_HOST")
                .unwrap_or_else(|_| DEFAULT_PYCROSS_HOST.to_string()),
            interva_host: std::env::var("INTERVA_HOST")
                .unwrap_or_else(|_| DEFAULT_INTERVA_HOST.to_string()),
            settings: AlgorithmSettings::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "PYCROSS_HOST",
            "INTERVA_HOST",
            "INTERVA_HIV",
            "INTERVA_MALARIA",
            "INTERVA_GROUPCODE",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_are_loopback_and_valid() {
        clear_env();
        let config = CodingConfig::from_env();
        assert_eq!(config.pycross_host, DEFAULT_PYCROSS_HOST);
        assert_eq!(config.interva_host, DEFAULT_INTERVA_HOST);
        assert!(config.settings.validate().is_ok());
    }

    #[test]
    #[serial]
    fn environment_overrides_are_picked_up() {
        clear_env();
        std::env::set_var("PYCROSS_HOST", "http://10.0.0.5:9001");
        std::env::set_var("INTERVA_HIV", "v");
        let config = CodingConfig::from_env();
        clear_env();
        assert_eq!(config.pycross_host, "http://10.0.0.5:9001");
        assert_eq!(config.settings.hiv, "v");
    }

    #[test]
    fn out_of_set_values_are_rejected() {
        let mut settings = AlgorithmSettings {
            hiv: "h".to_string(),
            malaria: "l".to_string(),
            groupcode: "True".to_string(),
            api: "True".to_string(),
        };
        assert!(settings.validate().is_ok());

        settings.malaria = "high".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Malaria"));
    }

    #[test]
    fn snapshot_uses_service_facing_key_names() {
        let settings = AlgorithmSettings {
            hiv: "h".to_string(),
            malaria: "l".to_string(),
            groupcode: "True".to_string(),
            api: "True".to_string(),
        };
        let snapshot = settings.snapshot();
        assert!(snapshot.contains("\"HIV\":\"h\""));
        assert!(snapshot.contains("\"Malaria\":\"l\""));
        assert!(snapshot.contains("\"groupcode\":\"True\""));
    }
}
