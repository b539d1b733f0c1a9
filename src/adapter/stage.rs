//! Stage identifiers and the static pipeline definition
//!
//! Every enhancement stage is named by a closed enum so dispatch is
//! checked at compile time. Wire names are kebab-case and stable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one enhancement stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageId {
    PromptAnalysis,
    MultiSolutionPuzzles,
    ProfessionalLayout,
    NpcEnhancement,
    TacticalCombat,
    EditorialExcellence,
    Accessibility,
    MechanicalValidation,
}

impl StageId {
    /// All stages in declaration order.
    pub const ALL: [StageId; 8] = [
        StageId::PromptAnalysis,
        StageId::MultiSolutionPuzzles,
        StageId::ProfessionalLayout,
        StageId::NpcEnhancement,
        StageId::TacticalCombat,
        StageId::EditorialExcellence,
        StageId::Accessibility,
        StageId::MechanicalValidation,
    ];

    /// Stable wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromptAnalysis => "prompt-analysis",
            Self::MultiSolutionPuzzles => "multi-solution-puzzles",
            Self::ProfessionalLayout => "professional-layout",
            Self::NpcEnhancement => "npc-enhancement",
            Self::TacticalCombat => "tactical-combat",
            Self::EditorialExcellence => "editorial-excellence",
            Self::Accessibility => "accessibility",
            Self::MechanicalValidation => "mechanical-validation",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::PromptAnalysis => "Prompt Analysis",
            Self::MultiSolutionPuzzles => "Multi-Solution Puzzles",
            Self::ProfessionalLayout => "Professional Layout",
            Self::NpcEnhancement => "NPC Enhancement",
            Self::TacticalCombat => "Tactical Combat",
            Self::EditorialExcellence => "Editorial Excellence",
            Self::Accessibility => "Accessibility",
            Self::MechanicalValidation => "Mechanical Validation",
        }
    }

    /// Maximum quality impact a stage contributes at a perfect quality signal.
    pub fn base_impact(&self) -> f64 {
        match self {
            Self::PromptAnalysis => 8.0,
            Self::MultiSolutionPuzzles => 12.0,
            Self::ProfessionalLayout => 10.0,
            Self::NpcEnhancement => 12.0,
            Self::TacticalCombat => 11.0,
            Self::EditorialExcellence => 9.0,
            Self::Accessibility => 6.0,
            Self::MechanicalValidation => 10.0,
        }
    }

    /// Legacy camelCase key used by version 1 configuration documents.
    pub fn legacy_key(&self) -> &'static str {
        match self {
            Self::PromptAnalysis => "promptAnalysis",
            Self::MultiSolutionPuzzles => "multiSolutionPuzzles",
            Self::ProfessionalLayout => "professionalLayout",
            Self::NpcEnhancement => "npcEnhancement",
            Self::TacticalCombat => "tacticalCombat",
            Self::EditorialExcellence => "editorialExcellence",
            Self::Accessibility => "accessibility",
            Self::MechanicalValidation => "mechanicalValidation",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned when a string names no known stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for StageId {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageId::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Current version of the built-in stage sequence
pub const PIPELINE_VERSION: &str = "2.1";

/// The fixed, versioned sequence of stages a pipeline walks.
///
/// Order only matters for reporting; stages never read each other's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub version: String,
    pub stages: Vec<StageId>,
}

impl PipelineDefinition {
    /// The built-in eight-stage definition.
    pub fn standard() -> Self {
        Self {
            version: PIPELINE_VERSION.to_string(),
            stages: StageId::ALL.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for PipelineDefinition {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_parse_back() {
        for stage in StageId::ALL {
            assert_eq!(stage.as_str().parse::<StageId>().unwrap(), stage);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "dice-roller".parse::<StageId>().unwrap_err();
        assert_eq!(err, UnknownStage("dice-roller".to_string()));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&StageId::NpcEnhancement).unwrap();
        assert_eq!(json, "\"npc-enhancement\"");
    }

    #[test]
    fn standard_definition_has_every_stage_once() {
        let def = PipelineDefinition::standard();
        assert_eq!(def.len(), 8);
        assert_eq!(def.version, PIPELINE_VERSION);
        let mut sorted = def.stages.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 8);
    }
}
