//! Client for the two-hop coding service chain
//!
//! One coding run is two sequential HTTP calls: the pyCrossVA transform
//! service converts the survey CSV to the algorithm's input schema, then
//! the InterVA5 service codes it. Either hop failing — network error,
//! non-success status, unreadable or malformed body, timeout — is fatal
//! to the whole batch; there is no retry or partial recovery.

use crate::config::CodingConfig;
use crate::error::{CodingError, ServiceHop};
use crate::models::VerbalAutopsy;
use crate::services::translator;
use std::time::Duration;

const USER_AGENT: &str = "vax-cc/0.1.0";

/// Transform-service schema versions (source survey → algorithm input)
const TRANSFORM_INPUT: &str = "2016WHOv151";
const TRANSFORM_OUTPUT: &str = "InterVA5";

/// Outbound request timeout; a timeout counts as a hop failure
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the transform + algorithm service pair
pub struct CodingClient {
    http_client: reqwest::Client,
    config: CodingConfig,
}

impl CodingClient {
    pub fn new(config: CodingConfig) -> Result<Self, CodingError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CodingError::service(ServiceHop::Transform, e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Run the record set through both hops, returning the decoded
    /// algorithm response.
    pub async fn run(
        &self,
        verbal_autopsies: &[VerbalAutopsy],
    ) -> Result<serde_json::Value, CodingError> {
        let va_csv = translator::to_pycross_csv(verbal_autopsies)?;

        let transform_url = format!(
            "{}/transform?input={}&output={}",
            self.config.pycross_host, TRANSFORM_INPUT, TRANSFORM_OUTPUT
        );

        tracing::debug!(
            records = verbal_autopsies.len(),
            url = %transform_url,
            "Posting records to transform service"
        );

        let transform_body = self
            .post_for_text(ServiceHop::Transform, &transform_url, va_csv)
            .await?;

        let algorithm_input =
            translator::pycross_csv_to_algorithm_input(&transform_body, &self.config.settings)?;

        let algorithm_url = format!("{}/interva5", self.config.interva_host);

        tracing::debug!(url = %algorithm_url, "Posting transformed records to algorithm service");

        let algorithm_body = self
            .post_for_text(ServiceHop::Algorithm, &algorithm_url, algorithm_input)
            .await?;

        let response: serde_json::Value = serde_json::from_str(&algorithm_body)
            .map_err(|e| CodingError::service(ServiceHop::Algorithm, format!("malformed JSON body: {e}")))?;

        tracing::info!(records = verbal_autopsies.len(), "Coding services responded");

        Ok(response)
    }

    async fn post_for_text(
        &self,
        hop: ServiceHop,
        url: &str,
        body: String,
    ) -> Result<String, CodingError> {
        let response = self
            .http_client
            .post(url)
            .body(body)
            .send()
            .await
            .map_err(|e| CodingError::service(hop, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CodingError::service(
                hop,
                format!("status {}: {}", status.as_u16(), error_text),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| CodingError::service(hop, format!("unreadable body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlgorithmSettings;

    fn test_config() -> CodingConfig {
        CodingConfig {
            pycross_host: "http://127.0.0.1:1".to_string(),
            interva_host: "http://127.0.0.1:1".to_string(),
            settings: AlgorithmSettings {
                hiv: "h".to_string(),
                malaria: "l".to_string(),
                groupcode: "True".to_string(),
                api: "True".to_string(),
            },
        }
    }

    #[test]
    fn client_creation_succeeds() {
        assert!(CodingClient::new(test_config()).is_ok());
    }

    #[tokio::test]
    async fn unreachable_transform_host_is_a_transform_hop_failure() {
        let client = CodingClient::new(test_config()).unwrap();
        let err = client.run(&[]).await.unwrap_err();
        match err {
            CodingError::Service { hop, .. } => assert_eq!(hop, ServiceHop::Transform),
            other => panic!("expected service error, got {other:?}"),
        }
    }
}
