//! Enhancement pipeline: orchestration and run records

mod orchestrator;
mod types;

pub use orchestrator::EnhancementPipeline;
pub use types::{
    Enhancement, PipelineError, PipelineState, ProcessingReport, StageResult, StageStatus,
};
