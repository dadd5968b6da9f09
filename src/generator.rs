use async_trait::async_trait;
use std::time::Duration;

use crate::error::GenerationError;
use crate::models::{CompletionRequest, CompletionResponse};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anything that turns a fully composed prompt into text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

// Anthropic Messages API client
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl Generator for AnthropicClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let res = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = res
            .json::<CompletionResponse>()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        first_text(body)
    }
}

// Text of the first content block
pub fn first_text(response: CompletionResponse) -> Result<String, GenerationError> {
    let block = response
        .content
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::Malformed("empty content".to_string()))?;

    match block.text {
        Some(text) if block.kind == "text" => Ok(text),
        _ => Err(GenerationError::Malformed(format!(
            "first content block is {:?}, not text",
            block.kind
        ))),
    }
}
