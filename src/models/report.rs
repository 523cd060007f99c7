use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pipeline::{ChunkingSummary, PipelineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStatus {
    pub stage: String,
    pub status: String,
}

/// Exported analysis of one document. `sections` has one entry per stage:
/// a JSON object, a raw string, or `{"error": message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub document_name: String,
    pub analysis_date: DateTime<Utc>,
    pub provider: String,
    pub stages: Vec<StageStatus>,
    pub sections: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunking: Option<ChunkingSummary>,
}

impl AnalysisReport {
    pub fn from_result(
        document_name: impl Into<String>,
        provider: impl Into<String>,
        result: &PipelineResult,
    ) -> Self {
        Self {
            document_name: document_name.into(),
            analysis_date: Utc::now(),
            provider: provider.into(),
            stages: result
                .records
                .iter()
                .map(|r| StageStatus {
                    stage: r.stage_id.clone(),
                    status: r.outcome.label().to_string(),
                })
                .collect(),
            sections: result.to_report_sections(),
            chunking: result.chunking.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(|s| s.status == "success")
    }

    /// Stages whose section is an error descriptor.
    pub fn failed_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| s.status == "failure" || s.status == "skipped")
            .map(|s| s.stage.as_str())
            .collect()
    }

    /// Sections in pipeline order.
    pub fn ordered_sections(&self) -> impl Iterator<Item = (&StageStatus, &Value)> {
        self.stages
            .iter()
            .filter_map(|s| self.sections.get(&s.stage).map(|v| (s, v)))
    }
}
