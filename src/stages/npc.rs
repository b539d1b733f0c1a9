//! NPC enhancement stage
//!
//! Gives every named character a role, a motivation, a secret, a
//! table-ready mannerism and adventure hooks.

use crate::adapter::{
    ContentKind, EnhancementAdapter, EnhancementInput, StageError, StageId, StageOptions,
    StageOutput,
};
use crate::backend::{decode, EnrichmentBackend, EnrichmentRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcProfile {
    pub name: String,
    pub role: String,
    pub motivation: String,
    pub secret: String,
    pub mannerism: String,
    #[serde(default)]
    pub hooks: Vec<String>,
}

impl NpcProfile {
    /// Fields a game master can use without further prep
    fn completeness(&self) -> f64 {
        let filled = [&self.role, &self.motivation, &self.secret, &self.mannerism]
            .iter()
            .filter(|f| !f.trim().is_empty())
            .count();
        let hooks = if self.hooks.is_empty() { 0 } else { 1 };
        (filled + hooks) as f64 / 5.0
    }
}

/// Typed result of the NPC stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcRoster {
    pub npcs: Vec<NpcProfile>,
}

impl NpcRoster {
    /// Up to three well-rounded NPCs earn full marks.
    pub fn quality(&self) -> f64 {
        if self.npcs.is_empty() {
            return 0.0;
        }
        let depth: f64 =
            self.npcs.iter().map(NpcProfile::completeness).sum::<f64>() / self.npcs.len() as f64;
        40.0 + 15.0 * self.npcs.len().min(3) as f64 * depth + 15.0 * depth
    }
}

pub struct NpcEnhancementAdapter {
    backend: Arc<dyn EnrichmentBackend>,
}

impl NpcEnhancementAdapter {
    pub fn new(backend: Arc<dyn EnrichmentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EnhancementAdapter for NpcEnhancementAdapter {
    fn stage(&self) -> StageId {
        StageId::NpcEnhancement
    }

    async fn check_available(&self) -> Result<bool, StageError> {
        Ok(self.backend.is_available().await)
    }

    fn validate(&self, input: &EnhancementInput) -> bool {
        matches!(
            input.content.kind,
            ContentKind::Npc | ContentKind::Adventure | ContentKind::Encounter
        ) && !input.content.is_blank()
    }

    async fn enhance(
        &self,
        input: &EnhancementInput,
        options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        let request = EnrichmentRequest::new(self.stage(), input, options);
        let roster: NpcRoster = decode(self.backend.produce(&request).await?)?;
        StageOutput::from_typed(&roster, roster.quality())
    }
}
