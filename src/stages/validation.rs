//! Mechanical validation stage
//!
//! Checks the numbers a game master will actually roll against: dice
//! expressions, difficulty classes and armor classes.

use crate::adapter::{
    EnhancementAdapter, EnhancementInput, StageError, StageId, StageOptions, StageOutput,
};
use crate::backend::{decode, EnrichmentBackend, EnrichmentRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Difficulty classes outside this range are almost always typos
pub const DC_RANGE: RangeInclusive<u32> = 5..=30;
pub const AC_RANGE: RangeInclusive<u32> = 5..=30;

/// Typed result of the validation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanicsReport {
    pub dice_checked: usize,
    #[serde(default)]
    pub invalid_dice: Vec<String>,
    #[serde(default)]
    pub difficulty_classes: Vec<u32>,
    #[serde(default)]
    pub out_of_range_dcs: Vec<u32>,
    #[serde(default)]
    pub armor_classes: Vec<u32>,
    #[serde(default)]
    pub out_of_range_acs: Vec<u32>,
    #[serde(default)]
    pub issues: Vec<String>,
    pub checks_performed: usize,
}

impl MechanicsReport {
    /// Content with no mechanics gets a neutral score rather than a perfect one.
    pub fn quality(&self) -> f64 {
        if self.checks_performed == 0 {
            return 60.0;
        }
        (100.0 - 12.0 * self.issues.len() as f64).max(0.0)
    }
}

pub struct MechanicalValidationAdapter {
    backend: Arc<dyn EnrichmentBackend>,
}

impl MechanicalValidationAdapter {
    pub fn new(backend: Arc<dyn EnrichmentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EnhancementAdapter for MechanicalValidationAdapter {
    fn stage(&self) -> StageId {
        StageId::MechanicalValidation
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
        let report: MechanicsReport = decode(self.backend.produce(&request).await?)?;
        StageOutput::from_typed(&report, report.quality())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ContentItem, ContentKind, GenerationContext};
    use crate::backend::MockBackend;

    #[test]
    fn no_checks_is_neutral() {
        let report: MechanicsReport =
            serde_json::from_value(serde_json::json!({"dice_checked": 0, "checks_performed": 0}))
                .unwrap();
        assert_eq!(report.quality(), 60.0);
    }

    #[tokio::test]
    async fn issues_lower_the_signal() {
        let backend = MockBackend::available().with_response(
            StageId::MechanicalValidation,
            serde_json::json!({
                "dice_checked": 2,
                "invalid_dice": ["3d7"],
                "difficulty_classes": [45],
                "out_of_range_dcs": [45],
                "issues": ["nonstandard die: 3d7", "DC 45 is outside 5-30"],
                "checks_performed": 3
            }),
        );
        let adapter = MechanicalValidationAdapter::new(Arc::new(backend));
        let input = EnhancementInput::new(
            ContentItem::new(ContentKind::Monster, "Ghoul", "Bite 3d7, DC 45."),
            GenerationContext::new("a ghoul"),
        );
        let output = adapter.enhance(&input, &StageOptions::default()).await.unwrap();
        assert_eq!(output.quality_signal, 76.0);
        assert_eq!(output.payload["invalid_dice"][0], "3d7");
    }
}
