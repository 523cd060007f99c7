use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Azure,
    OpenAI,
    Anthropic,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Azure => write!(f, "azure"),
            ProviderKind::OpenAI => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "azure" | "azure_openai" | "azure-openai" => Ok(ProviderKind::Azure),
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(Error::Config(format!("Unknown LLM provider: {}", other))),
        }
    }
}

/// Credentials and settings for the single LLM backend chosen at startup.
/// For Azure, `model` is the deployment name and `base_url` the resource endpoint.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
}

/// Raw provider-related variables; empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct ProviderVars {
    pub llm_provider: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: Option<String>,
}

impl ProviderVars {
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            llm_provider: var("LLM_PROVIDER"),
            azure_api_key: var("AZURE_OPENAI_API_KEY"),
            azure_endpoint: var("AZURE_OPENAI_ENDPOINT"),
            azure_deployment: var("AZURE_OPENAI_DEPLOYMENT_NAME"),
            azure_api_version: var("AZURE_OPENAI_API_VERSION"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL"),
            openai_base_url: var("OPENAI_BASE_URL"),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            anthropic_model: var("ANTHROPIC_MODEL"),
        }
    }

    fn azure_complete(&self) -> bool {
        self.azure_api_key.is_some() && self.azure_endpoint.is_some() && self.azure_deployment.is_some()
    }
}

/// Picks the backend. Without `LLM_PROVIDER` the order is a complete Azure
/// setup, then OpenAI, then Anthropic. An explicitly chosen backend must have
/// its credentials.
pub fn select_provider(vars: ProviderVars) -> Result<ProviderConfig> {
    let kind = match vars.llm_provider.as_deref() {
        Some(value) => value.parse()?,
        None if vars.azure_complete() => ProviderKind::Azure,
        None if vars.openai_api_key.is_some() => ProviderKind::OpenAI,
        None if vars.anthropic_api_key.is_some() => ProviderKind::Anthropic,
        // A partial Azure setup reports what is missing
        None if vars.azure_api_key.is_some() => ProviderKind::Azure,
        None => {
            return Err(Error::Config(
                "No LLM credentials found: set AZURE_OPENAI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY"
                    .to_string(),
            ))
        }
    };

    match kind {
        ProviderKind::Azure => {
            let missing: Vec<&str> = [
                ("AZURE_OPENAI_API_KEY", vars.azure_api_key.is_none()),
                ("AZURE_OPENAI_ENDPOINT", vars.azure_endpoint.is_none()),
                ("AZURE_OPENAI_DEPLOYMENT_NAME", vars.azure_deployment.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            if !missing.is_empty() {
                return Err(Error::Config(format!(
                    "Missing environment variables: {}",
                    missing.join(", ")
                )));
            }

            Ok(ProviderConfig {
                kind,
                api_key: vars.azure_api_key.unwrap_or_default(),
                model: vars.azure_deployment,
                base_url: vars.azure_endpoint,
                api_version: vars.azure_api_version,
            })
        }
        ProviderKind::OpenAI => Ok(ProviderConfig {
            kind,
            // An Azure key stands in for a missing OpenAI key
            api_key: vars.openai_api_key.or(vars.azure_api_key).ok_or_else(|| {
                Error::Config("OPENAI_API_KEY environment variable not set".to_string())
            })?,
            model: vars.openai_model,
            base_url: vars.openai_base_url,
            api_version: None,
        }),
        ProviderKind::Anthropic => Ok(ProviderConfig {
            kind,
            api_key: vars.anthropic_api_key.ok_or_else(|| {
                Error::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
            })?,
            model: vars.anthropic_model,
            base_url: None,
            api_version: None,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub database_path: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub large_document_threshold: usize,
    pub llm_timeout_secs: u64,
    pub max_retries: u32,
    pub concurrency_limit: usize,
}

/// `DATABASE_PATH`, or `contractanalyzer.db` in the working directory.
pub fn database_path_from_env() -> String {
    env::var("DATABASE_PATH").unwrap_or_else(|_| "contractanalyzer.db".to_string())
}

impl Config {
    /// Fails only on provider credentials; pipeline settings are validated
    /// once command-line overrides have been applied.
    pub fn from_env() -> Result<Self> {
        let provider = select_provider(ProviderVars::from_env())?;

        Ok(Self {
            provider,
            database_path: database_path_from_env(),
            chunk_size: parse_var("CHUNK_SIZE", 8000),
            chunk_overlap: parse_var("CHUNK_OVERLAP", 200),
            large_document_threshold: parse_var("LARGE_DOCUMENT_THRESHOLD", 12_000),
            llm_timeout_secs: parse_var("LLM_TIMEOUT_SECS", 120),
            max_retries: parse_var("LLM_MAX_RETRIES", 2),
            concurrency_limit: parse_var("CONCURRENCY_LIMIT", 2),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Documents longer than this many characters are chunked and only the
    /// first chunk is analyzed.
    pub large_document_threshold: usize,
    pub invocation_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.large_document_threshold < self.chunk_size {
            return Err(Error::Config(format!(
                "large document threshold ({}) must not be smaller than chunk size ({})",
                self.large_document_threshold, self.chunk_size
            )));
        }
        if self.invocation_timeout.is_zero() {
            return Err(Error::Config("LLM timeout must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn with_overrides(
        mut self,
        chunk_size: Option<usize>,
        chunk_overlap: Option<usize>,
        invocation_timeout: Option<Duration>,
    ) -> Self {
        if let Some(chunk_size) = chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = chunk_overlap {
            self.chunk_overlap = chunk_overlap;
        }
        if let Some(timeout) = invocation_timeout {
            self.invocation_timeout = timeout;
        }
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8000,
            chunk_overlap: 200,
            large_document_threshold: 12_000,
            invocation_timeout: Duration::from_secs(120),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            large_document_threshold: config.large_document_threshold,
            invocation_timeout: Duration::from_secs(config.llm_timeout_secs),
            max_retries: config.max_retries,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!(" openai ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!("Azure".parse::<ProviderKind>().unwrap(), ProviderKind::Azure);
        assert!("azure-magic".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_default_pipeline_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let config = PipelineConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..PipelineConfig::default()
        };
        match config.validate() {
            Err(Error::Config(msg)) => assert!(msg.contains("overlap")),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = PipelineConfig {
            invocation_timeout: Duration::ZERO,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn azure_vars() -> ProviderVars {
        ProviderVars {
            azure_api_key: some("azure-key"),
            azure_endpoint: some("https://contoso.openai.azure.com"),
            azure_deployment: some("gpt-4o-contracts"),
            ..ProviderVars::default()
        }
    }

    fn config_error(result: Result<ProviderConfig>) -> String {
        match result {
            Err(Error::Config(msg)) => msg,
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_credentials_is_config_error() {
        let msg = config_error(select_provider(ProviderVars::default()));
        assert!(msg.contains("No LLM credentials"));
    }

    #[test]
    fn test_complete_azure_wins_without_explicit_choice() {
        let vars = ProviderVars {
            openai_api_key: some("sk-openai"),
            anthropic_api_key: some("sk-ant"),
            azure_api_version: some("2024-06-01"),
            ..azure_vars()
        };

        let config = select_provider(vars).unwrap();
        assert_eq!(config.kind, ProviderKind::Azure);
        assert_eq!(config.api_key, "azure-key");
        assert_eq!(config.model.as_deref(), Some("gpt-4o-contracts"));
        assert_eq!(config.base_url.as_deref(), Some("https://contoso.openai.azure.com"));
        assert_eq!(config.api_version.as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn test_first_available_key_wins() {
        let vars = ProviderVars {
            openai_api_key: some("sk-openai"),
            anthropic_api_key: some("sk-ant"),
            ..ProviderVars::default()
        };
        assert_eq!(select_provider(vars).unwrap().kind, ProviderKind::OpenAI);

        let vars = ProviderVars {
            anthropic_api_key: some("sk-ant"),
            anthropic_model: some("claude-3-5-haiku-latest"),
            ..ProviderVars::default()
        };
        let config = select_provider(vars).unwrap();
        assert_eq!(config.kind, ProviderKind::Anthropic);
        assert_eq!(config.model.as_deref(), Some("claude-3-5-haiku-latest"));
    }

    #[test]
    fn test_partial_azure_lists_missing_variables() {
        let vars = ProviderVars {
            azure_api_key: some("azure-key"),
            ..ProviderVars::default()
        };

        let msg = config_error(select_provider(vars));
        assert!(msg.contains("AZURE_OPENAI_ENDPOINT"));
        assert!(msg.contains("AZURE_OPENAI_DEPLOYMENT_NAME"));
        assert!(!msg.contains("AZURE_OPENAI_API_KEY"));
    }

    #[test]
    fn test_explicit_choice_requires_its_key() {
        let vars = ProviderVars {
            llm_provider: some("anthropic"),
            openai_api_key: some("sk-openai"),
            ..ProviderVars::default()
        };
        assert!(config_error(select_provider(vars)).contains("ANTHROPIC_API_KEY"));

        let vars = ProviderVars {
            llm_provider: some("azure"),
            anthropic_api_key: some("sk-ant"),
            ..ProviderVars::default()
        };
        assert!(config_error(select_provider(vars)).contains("AZURE_OPENAI_API_KEY"));
    }

    #[test]
    fn test_explicit_choice_overrides_order() {
        let vars = ProviderVars {
            llm_provider: some("claude"),
            anthropic_api_key: some("sk-ant"),
            ..azure_vars()
        };
        assert_eq!(select_provider(vars).unwrap().kind, ProviderKind::Anthropic);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let vars = ProviderVars {
            llm_provider: some("gemini"),
            ..azure_vars()
        };
        assert!(config_error(select_provider(vars)).contains("gemini"));
    }

    #[test]
    fn test_openai_falls_back_to_azure_key() {
        let vars = ProviderVars {
            llm_provider: some("openai"),
            azure_api_key: some("azure-key"),
            ..ProviderVars::default()
        };

        let config = select_provider(vars).unwrap();
        assert_eq!(config.kind, ProviderKind::OpenAI);
        assert_eq!(config.api_key, "azure-key");
    }

    #[test]
    fn test_threshold_below_chunk_size_rejected() {
        let config = PipelineConfig {
            chunk_size: 8000,
            large_document_threshold: 4000,
            ..PipelineConfig::default()
        };
        match config.validate() {
            Err(Error::Config(msg)) => assert!(msg.contains("threshold")),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_overrides_repair_invalid_settings() {
        // CHUNK_OVERLAP=9000 with the default chunk size
        let from_env = PipelineConfig {
            chunk_overlap: 9000,
            ..PipelineConfig::default()
        };
        assert!(from_env.clone().validate().is_err());

        let config = from_env.with_overrides(None, Some(400), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_overlap, 400);
        assert_eq!(config.chunk_size, 8000);
        assert_eq!(config.invocation_timeout, Duration::from_secs(30));
    }
}
