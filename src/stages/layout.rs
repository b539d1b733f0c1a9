//! Professional layout stage
//!
//! Plans how the content sits on the page: section breakdown, read-aloud
//! boxes, tables, page estimate, and the layout problems worth fixing.

use crate::adapter::{
    EnhancementAdapter, EnhancementInput, StageError, StageId, StageOptions, StageOutput,
};
use crate::backend::{decode, EnrichmentBackend, EnrichmentRequest, Section};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Typed result of the layout stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub sections: Vec<Section>,
    pub read_aloud_blocks: usize,
    pub tables: usize,
    pub lists: usize,
    pub max_heading_depth: u8,
    pub estimated_pages: u32,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl LayoutPlan {
    pub fn quality(&self) -> f64 {
        (100.0 - 12.0 * self.issues.len() as f64).max(20.0)
    }
}

pub struct ProfessionalLayoutAdapter {
    backend: Arc<dyn EnrichmentBackend>,
}

impl ProfessionalLayoutAdapter {
    pub fn new(backend: Arc<dyn EnrichmentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EnhancementAdapter for ProfessionalLayoutAdapter {
    fn stage(&self) -> StageId {
        StageId::ProfessionalLayout
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
        let plan: LayoutPlan = decode(self.backend.produce(&request).await?)?;
        StageOutput::from_typed(&plan, plan.quality())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_lower_quality_with_floor() {
        let mut plan = LayoutPlan {
            sections: vec![],
            read_aloud_blocks: 0,
            tables: 0,
            lists: 0,
            max_heading_depth: 0,
            estimated_pages: 1,
            issues: vec![],
        };
        assert_eq!(plan.quality(), 100.0);
        plan.issues = vec!["a".into(), "b".into()];
        assert_eq!(plan.quality(), 76.0);
        plan.issues = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(plan.quality(), 20.0);
    }
}
