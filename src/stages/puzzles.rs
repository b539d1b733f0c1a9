//! Multi-solution puzzle stage
//!
//! Every puzzle should have more than one way through it. The stage asks
//! its backend for alternate solutions, a hint ladder and a fail-forward
//! outcome, and scores the result on approach diversity.

use crate::adapter::{
    ContentKind, EnhancementAdapter, EnhancementInput, StageError, StageId, StageOptions,
    StageOutput,
};
use crate::backend::{decode, EnrichmentBackend, EnrichmentRequest};
use crate::config::PerformanceMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Broad way a table might get past a puzzle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionApproach {
    Logic,
    Skill,
    Social,
    Magic,
    Force,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleSolution {
    pub approach: SolutionApproach,
    pub description: String,
    /// Ability check that resolves it, if any
    #[serde(default)]
    pub check: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleSpec {
    pub title: String,
    pub solutions: Vec<PuzzleSolution>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub fail_forward: Option<String>,
}

impl PuzzleSpec {
    fn quality(&self) -> f64 {
        let approaches: HashSet<_> = self.solutions.iter().map(|s| s.approach).collect();
        let hints = self.hints.len().min(3) as f64;
        let fail_forward = if self.fail_forward.is_some() { 10.0 } else { 0.0 };
        (30.0 + 15.0 * approaches.len() as f64 + 5.0 * hints + fail_forward).min(100.0)
    }
}

/// Typed result of the puzzle stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleDesign {
    pub puzzles: Vec<PuzzleSpec>,
}

impl PuzzleDesign {
    /// Mean puzzle quality; 0 when nothing was designed.
    pub fn quality(&self) -> f64 {
        if self.puzzles.is_empty() {
            return 0.0;
        }
        self.puzzles.iter().map(PuzzleSpec::quality).sum::<f64>() / self.puzzles.len() as f64
    }
}

/// How many alternate solutions to ask for per puzzle
pub fn solutions_for(mode: PerformanceMode) -> usize {
    match mode {
        PerformanceMode::Speed => 2,
        PerformanceMode::Balanced => 3,
        PerformanceMode::Quality => 4,
    }
}

pub struct MultiSolutionPuzzleAdapter {
    backend: Arc<dyn EnrichmentBackend>,
}

impl MultiSolutionPuzzleAdapter {
    pub fn new(backend: Arc<dyn EnrichmentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EnhancementAdapter for MultiSolutionPuzzleAdapter {
    fn stage(&self) -> StageId {
        StageId::MultiSolutionPuzzles
    }

    async fn check_available(&self) -> Result<bool, StageError> {
        Ok(self.backend.is_available().await)
    }

    fn validate(&self, input: &EnhancementInput) -> bool {
        matches!(input.content.kind, ContentKind::Puzzle | ContentKind::Adventure)
            && !input.content.is_blank()
    }

    async fn enhance(
        &self,
        input: &EnhancementInput,
        options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        let request = EnrichmentRequest::new(self.stage(), input, options);
        let design: PuzzleDesign = decode(self.backend.produce(&request).await?)?;
        if design.puzzles.iter().any(|p| p.solutions.is_empty()) {
            return Err(StageError::ExecutionFailure(
                "backend returned a puzzle without solutions".to_string(),
            ));
        }
        StageOutput::from_typed(&design, design.quality())
    }
}
