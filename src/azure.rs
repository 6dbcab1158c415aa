//! Shared HTTP plumbing for Azure OpenAI deployments.
//!
//! Both the embeddings and chat completion clients POST JSON to
//! `{endpoint}/openai/deployments/{deployment}/{operation}?api-version=...`
//! with an `api-key` header.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use crate::config::AzureConfig;
use crate::error::ServiceError;

/// Authenticated client for one Azure OpenAI resource.
#[derive(Clone)]
pub struct AzureClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    max_retries: u32,
}

impl AzureClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::MissingCredentials`] when the endpoint or API
    /// key is not configured (neither in the file nor in the environment).
    pub fn new(config: &AzureConfig) -> Result<Self, ServiceError> {
        let endpoint = config
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::MissingCredentials(
                    "azure.endpoint or AZURE_AI_ENDPOINT must be set".to_string(),
                )
            })?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::MissingCredentials(
                    "azure.api_key or AZURE_AI_KEY must be set".to_string(),
                )
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            api_version: config.api_version.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        deployment_url(&self.endpoint, deployment, operation, &self.api_version)
    }

    /// POST `body` to a deployment operation, retrying transient failures.
    pub async fn post_json(
        &self,
        deployment: &str,
        operation: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ServiceError> {
        let url = self.deployment_url(deployment, operation);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, %url, "retrying Azure OpenAI request");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&url, body).await {
                Ok(json) => return Ok(json),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(attempt, error = %e, "Azure OpenAI request failed");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ServiceError::Unavailable(format!("{} failed after retries", operation))
        }))
    }

    async fn send_once(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ServiceError> {
        let response = self
            .http
            .post(url)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            return decode_body(&text);
        }
        let body_text = response.text().await.unwrap_or_default();
        Err(ServiceError::Http {
            status: status.as_u16(),
            body: body_text,
        })
    }
}

/// Parse a successful response body; malformed JSON is not retried.
fn decode_body(text: &str) -> Result<serde_json::Value, ServiceError> {
    serde_json::from_str(text)
        .map_err(|e| ServiceError::InvalidResponse(format!("malformed JSON body: {}", e)))
}

fn deployment_url(endpoint: &str, deployment: &str, operation: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/{}?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        operation,
        api_version
    )
}
