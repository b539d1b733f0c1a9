//! Shared stub adapters and fixtures for pipeline integration tests
//!
//! Stubs are deterministic so two runs over the same registry and config
//! produce identical quality metrics.

#![allow(dead_code)]

use async_trait::async_trait;
use lorecraft::{
    AdapterRegistry, ContentItem, ContentKind, EnhancementAdapter, EnhancementInput,
    EnhancementPipeline, GenerationContext, StageError, StageId, StageOptions, StageOutput,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Completes with a fixed quality signal.
pub struct FixedStage {
    pub stage: StageId,
    pub signal: f64,
}

#[async_trait]
impl EnhancementAdapter for FixedStage {
    fn stage(&self) -> StageId {
        self.stage
    }

    fn validate(&self, _input: &EnhancementInput) -> bool {
        true
    }

    async fn enhance(
        &self,
        input: &EnhancementInput,
        _options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        StageOutput::from_typed(
            &serde_json::json!({ "stage": self.stage, "title": input.content.title }),
            self.signal,
        )
    }
}

/// Always raises during execution.
pub struct FailingStage(pub StageId);

#[async_trait]
impl EnhancementAdapter for FailingStage {
    fn stage(&self) -> StageId {
        self.0
    }

    fn validate(&self, _input: &EnhancementInput) -> bool {
        true
    }

    async fn enhance(
        &self,
        _input: &EnhancementInput,
        _options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        Err(StageError::ExecutionFailure(format!("{} blew up", self.0)))
    }
}

/// Sleeps before completing.
pub struct SlowStage {
    pub stage: StageId,
    pub delay: Duration,
}

#[async_trait]
impl EnhancementAdapter for SlowStage {
    fn stage(&self) -> StageId {
        self.stage
    }

    fn validate(&self, _input: &EnhancementInput) -> bool {
        true
    }

    async fn enhance(
        &self,
        _input: &EnhancementInput,
        _options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        tokio::time::sleep(self.delay).await;
        StageOutput::from_typed(&serde_json::json!({}), 100.0)
    }
}

/// Panics inside `enhance`.
pub struct PanickingStage(pub StageId);

#[async_trait]
impl EnhancementAdapter for PanickingStage {
    fn stage(&self) -> StageId {
        self.0
    }

    fn validate(&self, _input: &EnhancementInput) -> bool {
        true
    }

    async fn enhance(
        &self,
        _input: &EnhancementInput,
        _options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        panic!("stage {} panicked", self.0);
    }
}

/// Completes, counting how often setup ran.
#[derive(Default)]
pub struct CountingStage {
    pub setups: AtomicUsize,
}

#[async_trait]
impl EnhancementAdapter for CountingStage {
    fn stage(&self) -> StageId {
        StageId::PromptAnalysis
    }

    async fn setup(&self) -> Result<(), StageError> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn validate(&self, _input: &EnhancementInput) -> bool {
        true
    }

    async fn enhance(
        &self,
        _input: &EnhancementInput,
        _options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        StageOutput::from_typed(&serde_json::json!({}), 100.0)
    }
}

pub fn input() -> EnhancementInput {
    EnhancementInput::new(
        ContentItem::new(
            ContentKind::Adventure,
            "The Drowned Chapel",
            "# The Drowned Chapel\n\n> Water laps at the pews.\n\nThe chapel sank beneath the tide.",
        ),
        GenerationContext::new("a drowned chapel").with_party(3, 4),
    )
}

/// Every stage answers with a perfect signal.
pub fn perfect_adapters() -> Vec<Arc<dyn EnhancementAdapter>> {
    StageId::ALL
        .iter()
        .map(|&stage| {
            Arc::new(FixedStage {
                stage,
                signal: 100.0,
            }) as Arc<dyn EnhancementAdapter>
        })
        .collect()
}

/// Every stage answers perfectly except `failing`, which raises.
pub fn adapters_failing(failing: &[StageId]) -> Vec<Arc<dyn EnhancementAdapter>> {
    StageId::ALL
        .iter()
        .map(|&stage| -> Arc<dyn EnhancementAdapter> {
            if failing.contains(&stage) {
                Arc::new(FailingStage(stage))
            } else {
                Arc::new(FixedStage {
                    stage,
                    signal: 100.0,
                })
            }
        })
        .collect()
}

pub fn pipeline_with(adapters: Vec<Arc<dyn EnhancementAdapter>>) -> EnhancementPipeline {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(adapter).unwrap();
    }
    EnhancementPipeline::new(Arc::new(registry))
}
