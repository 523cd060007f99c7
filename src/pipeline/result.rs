use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::error::InvocationError;
use crate::pipeline::stage::StageValue;

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Structured(Map<String, Value>),
    Raw(String),
}

impl StageOutput {
    pub fn as_value(&self) -> StageValue<'_> {
        match self {
            StageOutput::Structured(map) => StageValue::Structured(map),
            StageOutput::Raw(text) => StageValue::Raw(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    DependencyUnmet { dependency: String },
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DependencyUnmet { dependency } => {
                write!(f, "Skipped: dependency '{}' did not complete", dependency)
            }
            SkipReason::Cancelled => write!(f, "Skipped: analysis was cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Success(StageOutput),
    /// The call succeeded but no JSON object could be recovered.
    ExtractionFallback(String),
    Failure(InvocationError),
    Skipped(SkipReason),
}

impl StageOutcome {
    /// The output a dependent stage can consume, if any.
    pub fn value(&self) -> Option<StageValue<'_>> {
        match self {
            StageOutcome::Success(output) => Some(output.as_value()),
            StageOutcome::ExtractionFallback(raw) => Some(StageValue::Raw(raw)),
            StageOutcome::Failure(_) | StageOutcome::Skipped(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::Success(_) => "success",
            StageOutcome::ExtractionFallback(_) => "extraction_fallback",
            StageOutcome::Failure(_) => "failure",
            StageOutcome::Skipped(_) => "skipped",
        }
    }

    /// One of the three shapes consumers accept: a mapping, a raw string, or
    /// `{"error": message}`.
    pub fn to_section(&self) -> Value {
        match self {
            StageOutcome::Success(StageOutput::Structured(map)) => Value::Object(map.clone()),
            StageOutcome::Success(StageOutput::Raw(text)) => Value::String(text.clone()),
            StageOutcome::ExtractionFallback(raw) => Value::String(raw.clone()),
            StageOutcome::Failure(error) => json!({ "error": error.to_string() }),
            StageOutcome::Skipped(reason) => json!({ "error": reason.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub stage_id: String,
    pub outcome: StageOutcome,
}

/// How an oversized document was cut down before analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingSummary {
    pub document_chars: usize,
    pub total_chunks: usize,
    pub analyzed_chunks: usize,
    pub analyzed_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineResult {
    pub records: Vec<StageRecord>,
    pub chunking: Option<ChunkingSummary>,
}

impl PipelineResult {
    pub fn outcome(&self, stage_id: &str) -> Option<&StageOutcome> {
        self.records
            .iter()
            .find(|r| r.stage_id == stage_id)
            .map(|r| &r.outcome)
    }

    pub fn is_complete(&self) -> bool {
        self.records.iter().all(|r| r.outcome.is_success())
    }

    pub fn count(&self, label: &str) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }

    pub fn to_report_sections(&self) -> Map<String, Value> {
        self.records
            .iter()
            .map(|r| (r.stage_id.clone(), r.outcome.to_section()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample() -> PipelineResult {
        let mut details = Map::new();
        details.insert("value".to_string(), json!(50000));

        PipelineResult {
            records: vec![
                StageRecord {
                    stage_id: "contract_details".to_string(),
                    outcome: StageOutcome::Success(StageOutput::Structured(details)),
                },
                StageRecord {
                    stage_id: "compliance_analysis".to_string(),
                    outcome: StageOutcome::ExtractionFallback("GDPR looks fine".to_string()),
                },
                StageRecord {
                    stage_id: "risk_assessment".to_string(),
                    outcome: StageOutcome::Failure(InvocationError::Timeout(Duration::from_secs(5))),
                },
                StageRecord {
                    stage_id: "executive_summary".to_string(),
                    outcome: StageOutcome::Skipped(SkipReason::DependencyUnmet {
                        dependency: "risk_assessment".to_string(),
                    }),
                },
            ],
            chunking: None,
        }
    }

    #[test]
    fn test_report_sections_shapes() {
        let sections = sample().to_report_sections();

        assert_eq!(sections["contract_details"], json!({"value": 50000}));
        assert_eq!(sections["compliance_analysis"], json!("GDPR looks fine"));
        assert!(sections["risk_assessment"]["error"]
            .as_str()
            .unwrap()
            .contains("timed out"));
        assert_eq!(
            sections["executive_summary"],
            json!({"error": "Skipped: dependency 'risk_assessment' did not complete"})
        );
    }

    #[test]
    fn test_dependency_values() {
        let result = sample();
        assert!(result
            .outcome("contract_details")
            .and_then(|o| o.value())
            .and_then(|v| v.as_structured())
            .is_some());
        assert_eq!(
            result.outcome("compliance_analysis").and_then(|o| o.value()),
            Some(StageValue::Raw("GDPR looks fine"))
        );
        assert!(result.outcome("risk_assessment").unwrap().value().is_none());
        assert!(result.outcome("missing").is_none());
    }

    #[test]
    fn test_counts() {
        let result = sample();
        assert!(!result.is_complete());
        assert_eq!(result.count("success"), 1);
        assert_eq!(result.count("extraction_fallback"), 1);
        assert_eq!(result.count("failure"), 1);
        assert_eq!(result.count("skipped"), 1);
    }
}
