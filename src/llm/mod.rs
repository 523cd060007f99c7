pub mod provider;
pub mod claude;
pub mod openai;
pub mod azure;
pub mod prompts;
pub mod parser;

use std::sync::Arc;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{Error, Result};

pub use provider::LLMProvider;
pub use claude::ClaudeProvider;
pub use openai::OpenAIProvider;
pub use azure::AzureOpenAIProvider;
pub use parser::{extract, Extracted};

/// Builds the one backend selected by configuration.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.kind {
        ProviderKind::Azure => {
            let (endpoint, deployment) = match (&config.base_url, &config.model) {
                (Some(endpoint), Some(deployment)) => (endpoint.clone(), deployment.clone()),
                _ => {
                    return Err(Error::Config(
                        "Azure OpenAI needs an endpoint and a deployment name".to_string(),
                    ))
                }
            };
            Arc::new(AzureOpenAIProvider::new(
                config.api_key.clone(),
                endpoint,
                deployment,
                config.api_version.clone(),
            )?)
        }
        ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
        )?),
        ProviderKind::Anthropic => Arc::new(ClaudeProvider::new(
            config.api_key.clone(),
            config.model.clone(),
        )?),
    };
    tracing::info!("Using {} backend", provider.name());
    Ok(provider)
}
