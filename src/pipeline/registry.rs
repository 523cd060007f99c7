use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::pipeline::stage::Stage;

/// An ordered set of stages in which every dependency names an earlier stage.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, stage_id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    pub fn position(&self, stage_id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == stage_id)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        if self.stages.is_empty() {
            return Err(Error::InvalidPipeline(
                "pipeline must have at least one stage".to_string(),
            ));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for stage in &self.stages {
            if stage.id.is_empty() {
                return Err(Error::InvalidPipeline("stage id must not be empty".to_string()));
            }

            for dependency in &stage.dependencies {
                if dependency == &stage.id {
                    return Err(Error::InvalidPipeline(format!(
                        "stage '{}' depends on itself",
                        stage.id
                    )));
                }
                // Earlier stages only, which also rules out cycles
                if !seen.contains(dependency.as_str()) {
                    return Err(Error::InvalidPipeline(format!(
                        "stage '{}' depends on '{}', which is not an earlier stage",
                        stage.id, dependency
                    )));
                }
            }

            if !seen.insert(stage.id.as_str()) {
                return Err(Error::InvalidPipeline(format!(
                    "duplicate stage id '{}'",
                    stage.id
                )));
            }
        }

        Ok(Pipeline {
            stages: self.stages,
        })
    }
}
