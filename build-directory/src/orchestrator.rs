const BASE_DELAY: u64 = 500;
const MAX_RETRIES: u32 = 3;

use crate::types::BuildRecord;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::{Duration, sleep};
use url::Url;

#[derive(Deserialize)]
struct BuildObject {
    metadata: BuildRecord,
}

#[derive(Deserialize)]
struct BuildList {
    items: Vec<BuildObject>,
}

#[derive(thiserror::Error, Debug)]
pub enum OrchestratorError {
    #[error("orchestrator request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("orchestrator responded with {0}")]
    UnexpectedStatus(StatusCode),
    #[error("orchestrator unavailable")]
    RetriesExceeded,
}

/// REST client for the builds API of the orchestration platform.
pub struct OrchestratorClient {
    client: reqwest::Client,
    builds_url: Url,
    label_selector: Option<String>,
    token: String,
}

impl OrchestratorClient {
    pub fn new(
        base_url: &Url,
        namespace: &str,
        label_selector: Option<String>,
        token: String,
    ) -> Result<Self, OrchestratorError> {
        let builds_url = Url::parse(&format!(
            "{}/apis/build.openshift.io/v1/namespaces/{}/builds",
            base_url.as_str().trim_end_matches('/'),
            namespace
        ))
        .map_err(|e| OrchestratorError::InvalidUrl(e.to_string()))?;

        Ok(OrchestratorClient {
            client: reqwest::Client::new(),
            builds_url,
            label_selector,
            token,
        })
    }

    /// Lists every build in the namespace, retrying transient failures with backoff.
    pub async fn list_builds(&self) -> Result<Vec<BuildRecord>, OrchestratorError> {
        const RETRIABLE_STATUS_CODES: &[StatusCode] = &[
            StatusCode::TOO_MANY_REQUESTS,     // 429
            StatusCode::INTERNAL_SERVER_ERROR, // 500
            StatusCode::BAD_GATEWAY,           // 502
            StatusCode::SERVICE_UNAVAILABLE,   // 503
            StatusCode::GATEWAY_TIMEOUT,       // 504
        ];

        let mut url = self.builds_url.clone();
        if let Some(selector) = &self.label_selector {
            url.query_pairs_mut().append_pair("labelSelector", selector);
        }

        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let list = response.json::<BuildList>().await?;
                return Ok(list.items.into_iter().map(|b| b.metadata).collect());
            }

            if !RETRIABLE_STATUS_CODES.contains(&status) {
                return Err(OrchestratorError::UnexpectedStatus(status));
            }
            if retries >= MAX_RETRIES {
                return Err(OrchestratorError::RetriesExceeded);
            }

            let retry_millis = BASE_DELAY * 2_u64.pow(retries);
            tracing::warn!(%status, retry_millis, "listing builds failed, retrying");
            sleep(Duration::from_millis(retry_millis)).await;
            retries += 1;
        }
    }

    /// Fetches a single build. A build the platform does not know is `Ok(None)`.
    pub async fn get_build(&self, name: &str) -> Result<Option<BuildRecord>, OrchestratorError> {
        // Dot segments would be dropped from the URL and address the listing.
        if matches!(name, "" | "." | "..") {
            return Ok(None);
        }

        let mut url = self.builds_url.clone();
        url.path_segments_mut()
            .map_err(|_| OrchestratorError::InvalidUrl(self.builds_url.to_string()))?
            .push(name);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                Ok(Some(response.json::<BuildObject>().await?.metadata))
            }
            status => Err(OrchestratorError::UnexpectedStatus(status)),
        }
    }
}
