pub mod cancel;
pub mod orchestrator;
pub mod registry;
pub mod result;
pub mod stage;

pub use cancel::CancellationFlag;
pub use orchestrator::{Orchestrator, StageEvent};
pub use registry::{Pipeline, PipelineBuilder};
pub use result::{
    ChunkingSummary, PipelineResult, SkipReason, StageOutcome, StageOutput, StageRecord,
};
pub use stage::{OutputKind, PromptBuilder, Stage, StageInputs, StageValue};
