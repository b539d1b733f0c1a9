//! Accessibility pass
//!
//! Missing alt text, skipped heading levels, colour-only cues and reading
//! grade: the things that make a handout hard to use at the table.

use crate::adapter::{
    EnhancementAdapter, EnhancementInput, StageError, StageId, StageOptions, StageOutput,
};
use crate::backend::{decode, EnrichmentBackend, EnrichmentRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Typed result of the accessibility stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityAudit {
    pub images: usize,
    pub images_missing_alt: usize,
    pub heading_skips: usize,
    pub color_only_cues: usize,
    /// Flesch-Kincaid grade level
    pub reading_grade: f64,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl AccessibilityAudit {
    pub fn quality(&self) -> f64 {
        (100.0 - 15.0 * self.issues.len() as f64).max(10.0)
    }
}

pub struct AccessibilityAdapter {
    backend: Arc<dyn EnrichmentBackend>,
}

impl AccessibilityAdapter {
    pub fn new(backend: Arc<dyn EnrichmentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EnhancementAdapter for AccessibilityAdapter {
    fn stage(&self) -> StageId {
        StageId::Accessibility
    }

    async fn check_available(&self) -> Result<bool, StageError> {
        Ok(self.backend.is_available().await)
    }

    fn validate(&self, input: &EnhancementInput) -> bool {
        !input.content.is_blank()
    }

    async fn enhance(
        &self,
        input: &EnhancementInput,
        options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        let request = EnrichmentRequest::new(self.stage(), input, options);
        let audit: AccessibilityAudit = decode(self.backend.produce(&request).await?)?;
        StageOutput::from_typed(&audit, audit.quality())
    }
}
