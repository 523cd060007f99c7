use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::PipelineConfig;
use crate::document::Chunker;
use crate::error::{InvocationError, Result};
use crate::llm::parser::{extract, Extracted};
use crate::llm::LLMProvider;
use crate::pipeline::cancel::CancellationFlag;
use crate::pipeline::registry::Pipeline;
use crate::pipeline::result::{
    ChunkingSummary, PipelineResult, SkipReason, StageOutcome, StageOutput, StageRecord,
};
use crate::pipeline::stage::{OutputKind, Stage, StageInputs};

const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Started {
        stage_index: usize,
        total_stages: usize,
        stage_id: String,
    },
    Finished {
        stage_index: usize,
        total_stages: usize,
        stage_id: String,
        outcome: &'static str,
    },
}

/// Runs pipelines against one LLM backend. Every run owns its result, so one
/// orchestrator can serve any number of concurrent runs.
pub struct Orchestrator {
    llm: Arc<dyn LLMProvider>,
    config: PipelineConfig,
    chunker: Chunker,
    cancellation: CancellationFlag,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LLMProvider>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;

        Ok(Self {
            llm,
            config,
            chunker,
            cancellation: CancellationFlag::new(),
        })
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.llm.name()
    }

    pub async fn run(&self, pipeline: &Pipeline, document_text: &str) -> PipelineResult {
        self.run_with_progress(pipeline, document_text, |_| {}).await
    }

    /// Executes every stage in declaration order. Never fails as a whole:
    /// each stage ends up with exactly one recorded outcome.
    pub async fn run_with_progress<F>(
        &self,
        pipeline: &Pipeline,
        document_text: &str,
        mut on_event: F,
    ) -> PipelineResult
    where
        F: FnMut(StageEvent),
    {
        let (input, chunking) = self.prepare_input(document_text);
        let total_stages = pipeline.len();
        let mut records: Vec<StageRecord> = Vec::with_capacity(total_stages);

        for (stage_index, stage) in pipeline.stages().iter().enumerate() {
            if self.cancellation.is_cancelled() {
                tracing::warn!(
                    "Run cancelled before stage '{}', skipping {} remaining stage(s)",
                    stage.id,
                    total_stages - stage_index
                );
                records.extend(pipeline.stages()[stage_index..].iter().map(|s| StageRecord {
                    stage_id: s.id.clone(),
                    outcome: StageOutcome::Skipped(SkipReason::Cancelled),
                }));
                break;
            }

            on_event(StageEvent::Started {
                stage_index,
                total_stages,
                stage_id: stage.id.clone(),
            });

            let prompt = resolve_inputs(stage, &records, &input).map(|inputs| stage.build_prompt(&inputs));

            let outcome = match prompt {
                Ok(prompt) => {
                    tracing::info!("Running stage '{}' ({}/{})", stage.id, stage_index + 1, total_stages);
                    tracing::debug!("Stage '{}' prompt is {} chars", stage.id, prompt.len());
                    self.execute(stage, &prompt).await
                }
                Err(dependency) => {
                    tracing::warn!(
                        "Skipping stage '{}': dependency '{}' did not complete",
                        stage.id,
                        dependency
                    );
                    StageOutcome::Skipped(SkipReason::DependencyUnmet { dependency })
                }
            };

            on_event(StageEvent::Finished {
                stage_index,
                total_stages,
                stage_id: stage.id.clone(),
                outcome: outcome.label(),
            });

            records.push(StageRecord {
                stage_id: stage.id.clone(),
                outcome,
            });
        }

        PipelineResult { records, chunking }
    }

    /// Oversized documents are chunked and only the first chunk is analyzed.
    fn prepare_input<'a>(&self, document_text: &'a str) -> (Cow<'a, str>, Option<ChunkingSummary>) {
        let document_chars = document_text.chars().count();
        if document_chars <= self.config.large_document_threshold {
            return (Cow::Borrowed(document_text), None);
        }

        let chunks = self.chunker.spans(document_text);
        let total_chunks = chunks.len();
        let first = match chunks.into_iter().next() {
            Some(chunk) => chunk,
            None => return (Cow::Borrowed(document_text), None),
        };

        tracing::warn!(
            "Document has {} chars (threshold {}); analyzing first of {} chunk(s) only",
            document_chars,
            self.config.large_document_threshold,
            total_chunks
        );

        let summary = ChunkingSummary {
            document_chars,
            total_chunks,
            analyzed_chunks: 1,
            analyzed_chars: first.len(),
        };
        (Cow::Owned(first.text), Some(summary))
    }

    async fn execute(&self, stage: &Stage, prompt: &str) -> StageOutcome {
        let text = match self.invoke_with_retry(stage, prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Stage '{}' failed: {}", stage.id, e);
                return StageOutcome::Failure(e);
            }
        };

        match stage.output_kind {
            OutputKind::Unstructured => StageOutcome::Success(StageOutput::Raw(text)),
            OutputKind::Structured => match extract(&text) {
                Extracted::Structured(map) => {
                    tracing::info!("Stage '{}' produced {} field(s)", stage.id, map.len());
                    StageOutcome::Success(StageOutput::Structured(map))
                }
                Extracted::Raw(raw) => {
                    tracing::warn!("Stage '{}' returned no JSON object, keeping raw text", stage.id);
                    StageOutcome::ExtractionFallback(raw)
                }
            },
        }
    }

    async fn invoke_with_retry(&self, stage: &Stage, prompt: &str) -> std::result::Result<String, InvocationError> {
        let limit = self.config.invocation_timeout;
        let mut attempt = 0;
        let mut backoff = self.config.retry_backoff;

        loop {
            let result = match timeout(limit, self.llm.invoke(prompt, limit)).await {
                Ok(result) => result,
                Err(_) => Err(InvocationError::Timeout(limit)),
            };

            match result {
                Err(e)
                    if e.is_retryable()
                        && attempt < self.config.max_retries
                        && !self.cancellation.is_cancelled() =>
                {
                    attempt += 1;
                    tracing::warn!(
                        "Stage '{}' attempt {}/{} failed: {}; retrying in {:?}",
                        stage.id,
                        attempt,
                        self.config.max_retries + 1,
                        e,
                        backoff
                    );
                    sleep(backoff).await;
                    if self.cancellation.is_cancelled() {
                        tracing::warn!("Stage '{}' cancelled during retry backoff", stage.id);
                        return Err(e);
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                other => return other,
            }
        }
    }
}

/// Collects the outputs of `stage`'s dependencies, or names the first one
/// that has nothing to offer.
fn resolve_inputs<'a>(
    stage: &'a Stage,
    records: &'a [StageRecord],
    document: &'a str,
) -> std::result::Result<StageInputs<'a>, String> {
    let mut values = Vec::with_capacity(stage.dependencies.len());

    for dependency in &stage.dependencies {
        let value = records
            .iter()
            .find(|r| &r.stage_id == dependency)
            .and_then(|r| r.outcome.value())
            .ok_or_else(|| dependency.clone())?;
        values.push((dependency.as_str(), value));
    }

    Ok(StageInputs::new(document, values))
}
