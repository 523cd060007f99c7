use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Builds a stage prompt from its inputs. A plain function pointer, so a
/// builder cannot capture state and always maps equal inputs to equal prompts.
pub type PromptBuilder = fn(&StageInputs<'_>) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    /// Response is run through the JSON extractor.
    Structured,
    /// Response is kept verbatim.
    Unstructured,
}

#[derive(Clone)]
pub struct Stage {
    pub id: String,
    pub dependencies: Vec<String>,
    pub output_kind: OutputKind,
    builder: PromptBuilder,
}

impl Stage {
    pub fn new(id: impl Into<String>, builder: PromptBuilder) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            output_kind: OutputKind::Structured,
            builder,
        }
    }

    pub fn depends_on(mut self, stage_id: impl Into<String>) -> Self {
        self.dependencies.push(stage_id.into());
        self
    }

    pub fn unstructured(mut self) -> Self {
        self.output_kind = OutputKind::Unstructured;
        self
    }

    pub fn build_prompt(&self, inputs: &StageInputs<'_>) -> String {
        (self.builder)(inputs)
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("output_kind", &self.output_kind)
            .finish()
    }
}

/// A dependency's output as seen by a prompt builder: the parsed mapping when
/// extraction succeeded, the raw model text otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageValue<'a> {
    Structured(&'a Map<String, Value>),
    Raw(&'a str),
}

impl<'a> StageValue<'a> {
    pub fn as_structured(&self) -> Option<&'a Map<String, Value>> {
        match self {
            StageValue::Structured(map) => Some(map),
            StageValue::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&'a str> {
        match self {
            StageValue::Raw(text) => Some(text),
            StageValue::Structured(_) => None,
        }
    }
}

/// Pretty JSON for structured values, the text itself for raw ones.
impl fmt::Display for StageValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageValue::Structured(map) => {
                let json = serde_json::to_string_pretty(map).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            StageValue::Raw(text) => f.write_str(text),
        }
    }
}

/// Everything a prompt builder may look at: the analyzed document text and
/// the outputs of the stage's declared dependencies, in declaration order.
#[derive(Debug, Clone)]
pub struct StageInputs<'a> {
    document: &'a str,
    dependencies: Vec<(&'a str, StageValue<'a>)>,
}

impl<'a> StageInputs<'a> {
    pub fn new(document: &'a str, dependencies: Vec<(&'a str, StageValue<'a>)>) -> Self {
        Self {
            document,
            dependencies,
        }
    }

    pub fn document(&self) -> &'a str {
        self.document
    }

    pub fn values(&self) -> impl Iterator<Item = StageValue<'a>> + '_ {
        self.dependencies.iter().map(|(_, value)| *value)
    }

    pub fn get(&self, stage_id: &str) -> Option<StageValue<'a>> {
        self.dependencies
            .iter()
            .find(|(id, _)| *id == stage_id)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}
