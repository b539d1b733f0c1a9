//! Pipeline orchestrator
//!
//! Runs every enabled stage concurrently over shared read-only input,
//! isolates their failures, and scores what comes back. One tokio task per
//! stage; results are collected in declared order regardless of which task
//! finishes first.

use super::types::{
    Enhancement, PipelineError, PipelineState, ProcessingReport, StageResult, StageStatus,
};
use crate::adapter::{
    AdapterDescriptor, AdapterRegistry, EnhancementInput, PipelineDefinition, StageError,
    StageId, StageOptions, StageOutput,
};
use crate::config::EnhancementConfig;
use crate::quality::QualityMetricsEngine;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Drives enhancement runs against a shared adapter registry.
pub struct EnhancementPipeline {
    registry: Arc<AdapterRegistry>,
    definition: PipelineDefinition,
    engine: QualityMetricsEngine,
}

enum Slot {
    Skipped(StageId),
    Running {
        stage: StageId,
        descriptor: Option<Arc<AdapterDescriptor>>,
        handle: JoinHandle<StageResult>,
    },
}

impl EnhancementPipeline {
    /// Create a pipeline walking the standard stage sequence
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            definition: PipelineDefinition::standard(),
            engine: QualityMetricsEngine::new(),
        }
    }

    /// Use a different stage sequence
    pub fn with_definition(mut self, definition: PipelineDefinition) -> Self {
        self.definition = definition;
        self
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn definition(&self) -> &PipelineDefinition {
        &self.definition
    }

    /// Enhance one piece of content.
    ///
    /// Stage failures never surface here in graceful mode: they are recorded
    /// in the report and the enhancement is returned. Only a malformed
    /// configuration, or any failed stage under strict fallback, is an error.
    pub async fn run(
        &self,
        input: EnhancementInput,
        config: &EnhancementConfig,
        session_id: Option<String>,
    ) -> Result<Enhancement, PipelineError> {
        let enabled = config.enabled_stages()?;
        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let span = tracing::info_span!(
            "enhance",
            session = %session_id,
            kind = input.content.kind.as_str()
        );

        async move {
            tracing::debug!(state = ?PipelineState::Pending, "pipeline queued");
            let started = Instant::now();
            tracing::debug!(
                state = ?PipelineState::Running,
                enabled = enabled.len(),
                "pipeline running"
            );

            let input = Arc::new(input);
            let options = StageOptions {
                performance_mode: config.performance_mode,
                session_id: session_id.clone(),
            };
            let timeout = config.stage_timeout();

            let slots: Vec<Slot> = self
                .definition
                .stages
                .iter()
                .map(|&stage| {
                    if !enabled.contains(&stage) {
                        return Slot::Skipped(stage);
                    }
                    let descriptor = self.registry.get(stage).ok();
                    let handle = tokio::spawn(
                        run_stage(
                            stage,
                            descriptor.clone(),
                            Arc::clone(&input),
                            options.clone(),
                            timeout,
                        )
                        .in_current_span(),
                    );
                    Slot::Running {
                        stage,
                        descriptor,
                        handle,
                    }
                })
                .collect();

            let mut results = Vec::with_capacity(slots.len());
            for slot in slots {
                results.push(match slot {
                    Slot::Skipped(stage) => StageResult::skipped(stage),
                    Slot::Running {
                        stage,
                        descriptor,
                        handle,
                    } => join_stage(stage, descriptor, handle, started).await,
                });
            }

            let report = ProcessingReport::from_results(
                results,
                started.elapsed(),
                self.definition.version.clone(),
            );
            tracing::info!(
                completed = report.completed_steps,
                failed = report.failed_steps,
                skipped = report.skipped_steps,
                elapsed_ms = report.processing_time.as_millis() as u64,
                state = ?report.state,
                "pipeline finished"
            );

            if config.is_strict() && report.failed_steps > 0 {
                return Err(PipelineError::PartialFailure {
                    report: Box::new(report),
                });
            }

            let assessment = self.engine.assess(&report);
            let stage_outputs: BTreeMap<StageId, StageOutput> = report
                .step_details
                .iter()
                .filter_map(|r| r.output.clone().map(|o| (r.stage, o)))
                .collect();
            let stages_applied = report
                .step_details
                .iter()
                .filter(|r| r.status == StageStatus::Completed)
                .map(|r| r.stage)
                .collect();

            Ok(Enhancement {
                session_id,
                created_at: chrono::Utc::now(),
                original_content: input.content.clone(),
                stage_outputs,
                quality_metrics: assessment.metrics,
                grade: assessment.grade,
                breakdown: assessment.breakdown,
                processing_time: report.processing_time,
                stages_applied,
                report,
            })
        }
        .instrument(span)
        .await
    }
}

/// Await one stage task. A panicked task becomes a failed result and is
/// charged to the adapter.
async fn join_stage(
    stage: StageId,
    descriptor: Option<Arc<AdapterDescriptor>>,
    handle: JoinHandle<StageResult>,
    started: Instant,
) -> StageResult {
    match handle.await {
        Ok(result) => result,
        Err(join_error) => {
            let err = StageError::ExecutionFailure(if join_error.is_panic() {
                "stage task panicked".to_string()
            } else {
                "stage task was cancelled".to_string()
            });
            let elapsed = started.elapsed();
            tracing::error!(%stage, error = %err, "stage task aborted");
            if let Some(descriptor) = descriptor {
                descriptor.record_failure(elapsed, &err);
            }
            StageResult::failed(stage, elapsed, &err)
        }
    }
}

/// One stage, start to finish, under the stage timeout.
async fn run_stage(
    stage: StageId,
    descriptor: Option<Arc<AdapterDescriptor>>,
    input: Arc<EnhancementInput>,
    options: StageOptions,
    timeout: Duration,
) -> StageResult {
    let started = Instant::now();
    let Some(descriptor) = descriptor else {
        let err = StageError::AdapterUnavailable(format!("no adapter registered for {}", stage));
        tracing::warn!(%stage, "enabled stage has no adapter");
        return StageResult::failed(stage, started.elapsed(), &err);
    };

    let outcome = tokio::time::timeout(timeout, attempt(&descriptor, &input, &options)).await;
    let elapsed = started.elapsed();
    match outcome {
        Ok(Ok(output)) => {
            let result = StageResult::completed(stage, elapsed, output);
            descriptor.record_impact(result.quality_impact);
            tracing::debug!(
                %stage,
                elapsed_ms = elapsed.as_millis() as u64,
                impact = result.quality_impact,
                "stage completed"
            );
            result
        }
        Ok(Err(err)) => {
            tracing::warn!(%stage, error = %err, "stage failed");
            StageResult::failed(stage, elapsed, &err)
        }
        Err(_) => {
            let err = StageError::Timeout(timeout);
            descriptor.record_failure(elapsed, &err);
            tracing::warn!(%stage, error = %err, "stage timed out");
            StageResult::failed(stage, elapsed, &err)
        }
    }
}

/// Ensure the adapter is ready, then execute. `execute` records its own
/// outcome; failures before it are recorded here.
async fn attempt(
    descriptor: &AdapterDescriptor,
    input: &EnhancementInput,
    options: &StageOptions,
) -> Result<StageOutput, StageError> {
    let started = Instant::now();
    if !descriptor.initialize().await {
        let err = StageError::AdapterUnavailable(format!(
            "{} failed to initialize",
            descriptor.name()
        ));
        descriptor.record_failure(started.elapsed(), &err);
        return Err(err);
    }
    if !descriptor.is_available().await {
        let err = StageError::AdapterUnavailable(format!("{} is not available", descriptor.name()));
        descriptor.record_failure(started.elapsed(), &err);
        return Err(err);
    }
    descriptor.execute(input, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ContentItem, ContentKind, GenerationContext};
    use crate::backend::{BackendError, MockBackend};
    use crate::config::{FallbackBehavior, PerformanceMode};
    use crate::quality::Grade;

    fn input() -> EnhancementInput {
        EnhancementInput::new(
            ContentItem::new(
                ContentKind::Adventure,
                "The Drowned Chapel",
                "# The Drowned Chapel\n\nThe chapel sank beneath the tide long ago.",
            ),
            GenerationContext::new("a drowned chapel"),
        )
    }

    fn layout_response() -> serde_json::Value {
        serde_json::json!({
            "sections": [],
            "read_aloud_blocks": 1,
            "tables": 0,
            "lists": 0,
            "max_heading_depth": 1,
            "estimated_pages": 1,
            "issues": []
        })
    }

    fn pipeline(backend: MockBackend) -> EnhancementPipeline {
        EnhancementPipeline::new(Arc::new(AdapterRegistry::with_builtin_adapters(Arc::new(
            backend,
        ))))
    }

    // === Scenario: disabled stages are never touched ===

    #[tokio::test]
    async fn disabled_stages_are_skipped_untouched() {
        let backend =
            MockBackend::available().with_response(StageId::ProfessionalLayout, layout_response());
        let pipeline = pipeline(backend);
        let config = EnhancementConfig::none().with_stage(StageId::ProfessionalLayout, true);

        let enhancement = pipeline.run(input(), &config, None).await.unwrap();

        assert_eq!(enhancement.report.total_steps, 8);
        assert_eq!(enhancement.report.completed_steps, 1);
        assert_eq!(enhancement.report.skipped_steps, 7);
        assert_eq!(enhancement.stages_applied, vec![StageId::ProfessionalLayout]);
        assert!(enhancement.stage_outputs.contains_key(&StageId::ProfessionalLayout));

        let metrics = pipeline.registry().metrics_snapshot();
        assert_eq!(metrics[&StageId::ProfessionalLayout].total_executions, 1);
        assert_eq!(metrics[&StageId::Accessibility].total_executions, 0);
        assert!(!pipeline
            .registry()
            .get(StageId::Accessibility)
            .unwrap()
            .is_initialized());
    }

    // === Scenario: a backend failure stays inside its stage ===

    #[tokio::test]
    async fn backend_failure_is_isolated() {
        let backend = MockBackend::available()
            .with_response(StageId::ProfessionalLayout, layout_response())
            .with_failure(
                StageId::Accessibility,
                BackendError::InvocationFailed("service returned 500".into()),
            );
        let pipeline = pipeline(backend);
        let config = EnhancementConfig::none()
            .with_stage(StageId::ProfessionalLayout, true)
            .with_stage(StageId::Accessibility, true);

        let enhancement = pipeline.run(input(), &config, Some("s-1".into())).await.unwrap();

        assert_eq!(enhancement.session_id, "s-1");
        let failed = enhancement.report.result(StageId::Accessibility).unwrap();
        assert_eq!(failed.status, StageStatus::Failed);
        assert_eq!(failed.quality_impact, 0.0);
        assert!(failed.error.as_deref().unwrap().contains("500"));
        assert_eq!(enhancement.quality_metrics.features_success_rate, 50.0);
    }

    // === Scenario: stage exceeds its timeout ===

    #[tokio::test]
    async fn slow_stage_times_out() {
        let backend = MockBackend::available()
            .with_response(StageId::ProfessionalLayout, layout_response())
            .with_delay(StageId::ProfessionalLayout, Duration::from_millis(500));
        let pipeline = pipeline(backend);
        let config = EnhancementConfig::none()
            .with_stage(StageId::ProfessionalLayout, true)
            .with_timeout_ms(20);

        let enhancement = pipeline.run(input(), &config, None).await.unwrap();

        let result = enhancement.report.result(StageId::ProfessionalLayout).unwrap();
        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("timed out after 20ms"));

        let metrics = pipeline.registry().metrics_snapshot();
        assert_eq!(metrics[&StageId::ProfessionalLayout].total_executions, 1);
        assert_eq!(metrics[&StageId::ProfessionalLayout].successful_executions, 0);
    }

    // === Scenario: unavailable backend ===

    #[tokio::test]
    async fn unavailable_backend_fails_every_enabled_stage() {
        let pipeline = pipeline(MockBackend::unavailable());
        let config = EnhancementConfig::for_mode(PerformanceMode::Speed);

        let enhancement = pipeline.run(input(), &config, None).await.unwrap();

        assert_eq!(enhancement.report.failed_steps, 3);
        assert!(enhancement.stage_outputs.is_empty());
        assert_eq!(enhancement.quality_metrics.features_success_rate, 0.0);
        assert_eq!(enhancement.grade, Grade::Standard);
        for stage in enhancement.report.failed_stages() {
            let error = enhancement.report.result(stage).unwrap().error.clone().unwrap();
            assert!(error.starts_with("adapter unavailable"), "{}", error);
        }
    }

    // === Scenario: enabled stage with no registered adapter ===

    #[tokio::test]
    async fn unregistered_stage_fails_as_unavailable() {
        let pipeline = EnhancementPipeline::new(Arc::new(AdapterRegistry::new()));
        let config = EnhancementConfig::none().with_stage(StageId::TacticalCombat, true);

        let enhancement = pipeline.run(input(), &config, None).await.unwrap();
        let result = enhancement.report.result(StageId::TacticalCombat).unwrap();
        assert_eq!(result.status, StageStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("no adapter registered"));
    }

    // === Scenario: strict fallback ===

    #[tokio::test]
    async fn strict_mode_surfaces_partial_failure() {
        let pipeline = pipeline(MockBackend::unavailable());
        let config = EnhancementConfig::none()
            .with_stage(StageId::Accessibility, true)
            .with_fallback(FallbackBehavior::Strict);

        match pipeline.run(input(), &config, None).await {
            Err(PipelineError::PartialFailure { report }) => {
                assert_eq!(report.failed_steps, 1);
                assert_eq!(report.total_steps, 8);
            }
            other => panic!("expected partial failure, got {:?}", other.map(|e| e.grade)),
        }
    }

    #[tokio::test]
    async fn malformed_config_is_a_hard_error() {
        let pipeline = pipeline(MockBackend::available());
        let mut config = EnhancementConfig::default();
        config.stages.insert("time-travel".into(), true);

        let err = pipeline.run(input(), &config, None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    // === Scenario: heuristic backend end to end ===

    #[tokio::test]
    async fn heuristic_backend_runs_every_stage() {
        let registry = AdapterRegistry::with_builtin_adapters(Arc::new(
            crate::backend::HeuristicBackend::new(),
        ));
        let pipeline = EnhancementPipeline::new(Arc::new(registry));
        let input = EnhancementInput::new(
            ContentItem::new(
                ContentKind::Adventure,
                "The Drowned Chapel",
                "# The Drowned Chapel\n\n\
                 > Water laps at the broken pews.\n\n\
                 **Sister Maren** is the last priest here. She needs help.\n\n\
                 ## The Rune Door\n\n\
                 A sealed door bears three runes. Solving it takes a DC 13 Intelligence check.\n\n\
                 ## The Nave\n\n\
                 Two ghouls (CR 1, AC 12) lurk among the pillars and strike for 2d6+2 damage.",
            ),
            GenerationContext::new("a drowned chapel with ghouls").with_party(3, 4),
        );

        let enhancement = pipeline
            .run(input, &EnhancementConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(enhancement.report.completed_steps, 8, "{:#?}", enhancement.report);
        assert_eq!(enhancement.quality_metrics.features_success_rate, 100.0);
        assert!(enhancement.grade >= Grade::Professional);
    }
}
