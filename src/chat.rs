//! Chat completion service abstraction and the Azure OpenAI implementation.

use async_trait::async_trait;

use crate::azure::AzureClient;
use crate::config::AzureConfig;
use crate::error::ServiceError;

/// A single-turn chat completion: system instruction plus one user message.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ServiceError>;
}

/// Chat completions from an Azure OpenAI deployment (e.g. `gpt-4`).
pub struct AzureChat {
    client: AzureClient,
    deployment: String,
    temperature: Option<f32>,
}

impl AzureChat {
    pub fn new(config: &AzureConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: AzureClient::new(config)?,
            deployment: config.chat_deployment.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatService for AzureChat {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ServiceError> {
        let body = chat_request_body(system_prompt, user_prompt, self.temperature);
        let json = self
            .client
            .post_json(&self.deployment, "chat/completions", &body)
            .await?;
        parse_chat_response(&json)
    }
}

fn chat_request_body(system: &str, user: &str, temperature: Option<f32>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": user },
        ],
    });
    if let Some(t) = temperature {
        body["temperature"] = serde_json::json!(t);
    }
    body
}

/// Content of the first choice of a chat completion response.
pub fn parse_chat_response(json: &serde_json::Value) -> Result<String, ServiceError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .map(|content| content.as_str().unwrap_or_default().to_string())
        .ok_or_else(|| ServiceError::InvalidResponse("missing choices[0].message.content".into()))
}
