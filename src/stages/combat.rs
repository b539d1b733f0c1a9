//! Tactical combat stage
//!
//! Rates encounter difficulty against the party, pulls out terrain worth
//! fighting over, and scripts how the opposition behaves round to round.

use crate::adapter::{
    ContentKind, EnhancementAdapter, EnhancementInput, StageError, StageId, StageOptions,
    StageOutput,
};
use crate::backend::{decode, EnrichmentBackend, EnrichmentRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Trivial,
    Easy,
    Medium,
    Hard,
    Deadly,
    Unknown,
}

impl Difficulty {
    /// Rate total challenge against a party.
    ///
    /// The ratio compares summed challenge ratings to party level, scaled
    /// for parties larger or smaller than four.
    pub fn rate(
        challenge_ratings: &[u32],
        party_level: Option<u8>,
        party_size: Option<u8>,
    ) -> Self {
        let Some(level) = party_level.filter(|l| *l > 0) else {
            return Self::Unknown;
        };
        if challenge_ratings.is_empty() {
            return Self::Unknown;
        }
        let size = party_size.filter(|s| *s > 0).unwrap_or(4) as f64;
        let total: f64 = challenge_ratings.iter().map(|&cr| cr as f64).sum();
        let ratio = total / level as f64 * (4.0 / size);
        match ratio {
            r if r < 0.5 => Self::Trivial,
            r if r < 0.75 => Self::Easy,
            r if r < 1.0 => Self::Medium,
            r if r < 1.5 => Self::Hard,
            _ => Self::Deadly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticalPhase {
    pub trigger: String,
    pub behavior: String,
}

/// Typed result of the combat stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatPlan {
    pub difficulty: Difficulty,
    pub challenge_ratings: Vec<u32>,
    pub armor_classes: Vec<u32>,
    pub terrain_features: Vec<String>,
    pub phases: Vec<TacticalPhase>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl CombatPlan {
    pub fn quality(&self) -> f64 {
        let terrain = self.terrain_features.len().min(3) as f64;
        let phases = self.phases.len().min(3) as f64;
        let rated = if self.difficulty == Difficulty::Unknown { 0.0 } else { 15.0 };
        40.0 + 10.0 * terrain + 5.0 * phases + rated
    }
}

pub struct TacticalCombatAdapter {
    backend: Arc<dyn EnrichmentBackend>,
}

impl TacticalCombatAdapter {
    pub fn new(backend: Arc<dyn EnrichmentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EnhancementAdapter for TacticalCombatAdapter {
    fn stage(&self) -> StageId {
        StageId::TacticalCombat
    }

    async fn check_available(&self) -> Result<bool, StageError> {
        Ok(self.backend.is_available().await)
    }

    fn validate(&self, input: &EnhancementInput) -> bool {
        matches!(
            input.content.kind,
            ContentKind::Monster | ContentKind::Encounter | ContentKind::Adventure
        ) && !input.content.is_blank()
    }

    async fn enhance(
        &self,
        input: &EnhancementInput,
        options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        let request = EnrichmentRequest::new(self.stage(), input, options);
        let plan: CombatPlan = decode(self.backend.produce(&request).await?)?;
        StageOutput::from_typed(&plan, plan.quality())
    }
}
