use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{InvocationError, Result};
use crate::llm::openai::{send_chat, ChatRequest};
use crate::llm::provider::LLMProvider;

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Azure OpenAI chat completions, addressed by deployment rather than model.
pub struct AzureOpenAIProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
}

impl AzureOpenAIProvider {
    pub fn new(
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment,
            api_version: api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[async_trait]
impl LLMProvider for AzureOpenAIProvider {
    async fn invoke(&self, prompt: &str, timeout: Duration) -> std::result::Result<String, InvocationError> {
        let body = ChatRequest::new(None, prompt);
        let request = self
            .client
            .post(self.chat_url())
            .header("api-key", &self.api_key);

        send_chat(request, &body, timeout, "Azure OpenAI").await
    }

    fn name(&self) -> &str {
        "Azure OpenAI"
    }
}
