use indicatif::{ProgressBar, ProgressStyle};

use crate::analysis::stages::contract_pipeline;
use crate::error::{Error, Result};
use crate::models::AnalysisReport;
use crate::pipeline::{Orchestrator, Pipeline, StageEvent};
use crate::document::ParsedDocument;

/// Runs the contract pipeline over parsed documents and packages the
/// outcome as an `AnalysisReport`.
pub struct ContractAnalyzer {
    orchestrator: Orchestrator,
    pipeline: Pipeline,
    show_progress: bool,
}

impl ContractAnalyzer {
    pub fn new(orchestrator: Orchestrator) -> Result<Self> {
        Ok(Self {
            orchestrator,
            pipeline: contract_pipeline()?,
            show_progress: true,
        })
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Fails only when the document itself is unusable; stage failures are
    /// reported inside the returned report.
    pub async fn analyze(&self, document: &ParsedDocument) -> Result<AnalysisReport> {
        if !document.success {
            return Err(Error::Document(format!(
                "{}: {}",
                document.name,
                document.error.as_deref().unwrap_or("unknown error")
            )));
        }
        if document.text.trim().is_empty() {
            return Err(Error::Document(format!("{}: no text extracted", document.name)));
        }

        tracing::info!(
            "Analyzing {} ({} chars) with {}",
            document.name,
            document.metadata.characters,
            self.orchestrator.provider_name()
        );

        let pb = self.progress_bar(&document.name);
        let result = self
            .orchestrator
            .run_with_progress(&self.pipeline, &document.text, |event| match event {
                StageEvent::Started { stage_id, .. } => pb.set_message(stage_id),
                StageEvent::Finished { .. } => pb.inc(1),
            })
            .await;
        pb.finish_with_message("done");

        let report = AnalysisReport::from_result(&document.name, self.orchestrator.provider_name(), &result);
        if report.is_complete() {
            tracing::info!("Analysis of {} complete", document.name);
        } else {
            tracing::warn!(
                "Analysis of {} is partial; unavailable sections: {:?}",
                document.name,
                report.failed_stages()
            );
        }

        Ok(report)
    }

    fn progress_bar(&self, name: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(self.pipeline.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} stages {prefix} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_prefix(name.to_string());
        pb
    }
}
