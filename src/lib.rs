pub mod config;
pub mod error;
pub mod models;
pub mod document;
pub mod llm;
pub mod pipeline;
pub mod analysis;
pub mod storage;

pub use config::{Config, PipelineConfig};
pub use error::{Error, InvocationError, Result};
pub use document::{read_document, Chunker, ParsedDocument};
pub use llm::{build_provider, AzureOpenAIProvider, ClaudeProvider, LLMProvider, OpenAIProvider};
pub use pipeline::{CancellationFlag, Orchestrator, Pipeline, PipelineResult, Stage};
pub use analysis::ContractAnalyzer;
pub use storage::Storage;
