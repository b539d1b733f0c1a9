//! Built-in enhancement stages
//!
//! One adapter per pipeline stage. Each asks an `EnrichmentBackend` for raw
//! enrichment, decodes it into the stage's typed result and scores it.

mod accessibility;
mod combat;
mod editorial;
mod layout;
mod npc;
mod prompt_analysis;
mod puzzles;
mod validation;

pub use accessibility::{AccessibilityAdapter, AccessibilityAudit};
pub use combat::{CombatPlan, Difficulty, TacticalCombatAdapter, TacticalPhase};
pub use editorial::{EditorialExcellenceAdapter, EditorialReview, MIN_EDITABLE_WORDS};
pub use layout::{LayoutPlan, ProfessionalLayoutAdapter};
pub use npc::{NpcEnhancementAdapter, NpcProfile, NpcRoster};
pub use prompt_analysis::{PromptAnalysis, PromptAnalysisAdapter, PromptComplexity};
pub use puzzles::{
    solutions_for, MultiSolutionPuzzleAdapter, PuzzleDesign, PuzzleSolution, PuzzleSpec,
    SolutionApproach,
};
pub use validation::{MechanicalValidationAdapter, MechanicsReport, AC_RANGE, DC_RANGE};

use crate::adapter::EnhancementAdapter;
use crate::backend::EnrichmentBackend;
use std::sync::Arc;

/// One adapter per stage of the standard pipeline, all sharing `backend`.
pub fn builtin_adapters(backend: Arc<dyn EnrichmentBackend>) -> Vec<Arc<dyn EnhancementAdapter>> {
    vec![
        Arc::new(PromptAnalysisAdapter::new(backend.clone())),
        Arc::new(MultiSolutionPuzzleAdapter::new(backend.clone())),
        Arc::new(ProfessionalLayoutAdapter::new(backend.clone())),
        Arc::new(NpcEnhancementAdapter::new(backend.clone())),
        Arc::new(TacticalCombatAdapter::new(backend.clone())),
        Arc::new(EditorialExcellenceAdapter::new(backend.clone())),
        Arc::new(AccessibilityAdapter::new(backend.clone())),
        Arc::new(MechanicalValidationAdapter::new(backend)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StageId;
    use crate::backend::MockBackend;

    #[test]
    fn builtins_cover_every_stage_once() {
        let adapters = builtin_adapters(Arc::new(MockBackend::available()));
        let stages: Vec<StageId> = adapters.iter().map(|a| a.stage()).collect();
        assert_eq!(stages, StageId::ALL.to_vec());
    }
}
