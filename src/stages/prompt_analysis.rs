//! Prompt analysis stage
//!
//! Checks how well the generated content answers the prompt it came from:
//! detected themes, tone, and which prompt terms the body never touches.

use crate::adapter::{
    EnhancementAdapter, EnhancementInput, StageError, StageId, StageOptions, StageOutput,
};
use crate::backend::{decode, EnrichmentBackend, EnrichmentRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptComplexity {
    Simple,
    Moderate,
    Complex,
}

/// Typed result of the prompt analysis stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptAnalysis {
    pub themes: Vec<String>,
    pub tone: String,
    pub complexity: PromptComplexity,
    /// Fraction of prompt terms present in the body, 0-1
    pub prompt_coverage: f64,
    pub covered_terms: Vec<String>,
    pub missing_terms: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl PromptAnalysis {
    pub fn quality(&self) -> f64 {
        let themes = self.themes.len().min(2) as f64;
        40.0 + 50.0 * self.prompt_coverage.clamp(0.0, 1.0) + 5.0 * themes
    }
}

pub struct PromptAnalysisAdapter {
    backend: Arc<dyn EnrichmentBackend>,
}

impl PromptAnalysisAdapter {
    pub fn new(backend: Arc<dyn EnrichmentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EnhancementAdapter for PromptAnalysisAdapter {
    fn stage(&self) -> StageId {
        StageId::PromptAnalysis
    }

    async fn check_available(&self) -> Result<bool, StageError> {
        Ok(self.backend.is_available().await)
    }

    fn validate(&self, input: &EnhancementInput) -> bool {
        !input.context.prompt.trim().is_empty() && !input.content.is_blank()
    }

    async fn enhance(
        &self,
        input: &EnhancementInput,
        options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        let request = EnrichmentRequest::new(self.stage(), input, options);
        let analysis: PromptAnalysis = decode(self.backend.produce(&request).await?)?;
        StageOutput::from_typed(&analysis, analysis.quality())
    }
}
