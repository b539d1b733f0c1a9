//! Pipeline run records: per-stage results, the processing report and
//! the finished enhancement.

use crate::adapter::{duration_millis, ContentItem, StageError, StageId, StageOutput};
use crate::config::ConfigError;
use crate::quality::{Grade, QualityBreakdown, QualityMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
    Skipped,
}

/// Outcome of one stage in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    #[serde(rename = "stage_name")]
    pub stage: StageId,
    pub status: StageStatus,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub output: Option<StageOutput>,
    pub error: Option<String>,
    pub quality_impact: f64,
}

impl StageResult {
    /// A successful stage. Impact is the stage's base impact scaled by its
    /// quality signal.
    pub fn completed(stage: StageId, duration: Duration, output: StageOutput) -> Self {
        let quality_impact = stage.base_impact() * output.quality_signal / 100.0;
        Self {
            stage,
            status: StageStatus::Completed,
            duration,
            output: Some(output),
            error: None,
            quality_impact,
        }
    }

    pub fn failed(stage: StageId, duration: Duration, error: &StageError) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            duration,
            output: None,
            error: Some(error.to_string()),
            quality_impact: 0.0,
        }
    }

    pub fn skipped(stage: StageId) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            duration: Duration::ZERO,
            output: None,
            error: None,
            quality_impact: 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StageStatus::Completed
    }

    /// Quality signal of a completed stage
    pub fn quality_signal(&self) -> Option<f64> {
        self.output.as_ref().map(|o| o.quality_signal)
    }
}

/// Lifecycle of one pipeline invocation. A finished report only ever
/// carries a terminal state; `Pending` and `Running` tag the in-flight
/// run in the `enhance` span's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Running,
    Completed,
    CompletedWithDegradation,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::CompletedWithDegradation
        )
    }
}

/// Per-run accounting. `total_steps` always equals the sum of the other
/// three counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    #[serde(with = "duration_millis")]
    pub processing_time: Duration,
    pub step_details: Vec<StageResult>,
    pub state: PipelineState,
    pub definition_version: String,
}

impl ProcessingReport {
    /// Count up results given in declared order.
    pub fn from_results(
        step_details: Vec<StageResult>,
        processing_time: Duration,
        definition_version: impl Into<String>,
    ) -> Self {
        let count = |status: StageStatus| {
            step_details
                .iter()
                .filter(|r| r.status == status)
                .count()
        };
        let completed_steps = count(StageStatus::Completed);
        let failed_steps = count(StageStatus::Failed);
        let skipped_steps = count(StageStatus::Skipped);
        let state = if failed_steps > 0 {
            PipelineState::CompletedWithDegradation
        } else {
            PipelineState::Completed
        };
        Self {
            total_steps: step_details.len(),
            completed_steps,
            failed_steps,
            skipped_steps,
            processing_time,
            step_details,
            state,
            definition_version: definition_version.into(),
        }
    }

    /// Stages that were attempted (not skipped)
    pub fn enabled_steps(&self) -> usize {
        self.completed_steps + self.failed_steps
    }

    pub fn result(&self, stage: StageId) -> Option<&StageResult> {
        self.step_details.iter().find(|r| r.stage == stage)
    }

    pub fn failed_stages(&self) -> Vec<StageId> {
        self.step_details
            .iter()
            .filter(|r| r.status == StageStatus::Failed)
            .map(|r| r.stage)
            .collect()
    }
}

/// The scored result of one pipeline run. Never mutated after return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub original_content: ContentItem,
    pub stage_outputs: BTreeMap<StageId, StageOutput>,
    pub quality_metrics: QualityMetrics,
    pub grade: Grade,
    pub breakdown: QualityBreakdown,
    #[serde(with = "duration_millis")]
    pub processing_time: Duration,
    /// Completed stages in declared order
    pub stages_applied: Vec<StageId>,
    pub report: ProcessingReport,
}

/// Errors that escape a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(
        "{} of {} enabled stages failed",
        .report.failed_steps,
        .report.enabled_steps()
    )]
    PartialFailure { report: Box<ProcessingReport> },
}
