//! Core types shared by adapters: the input envelope, per-call options,
//! stage output and the stage-boundary error taxonomy.

use crate::config::PerformanceMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What kind of generated content is being enhanced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Adventure,
    Npc,
    Monster,
    Puzzle,
    Encounter,
    Other,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adventure => "adventure",
            Self::Npc => "npc",
            Self::Monster => "monster",
            Self::Puzzle => "puzzle",
            Self::Encounter => "encounter",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adventure" => Ok(Self::Adventure),
            "npc" => Ok(Self::Npc),
            "monster" => Ok(Self::Monster),
            "puzzle" => Ok(Self::Puzzle),
            "encounter" => Ok(Self::Encounter),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

/// A piece of generated content. Opaque to the pipeline; owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub title: String,
    /// Markdown body produced by the generator
    pub body: String,
}

impl ContentItem {
    pub fn new(kind: ContentKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }

    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// The generation request the content was produced from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub prompt: String,
    /// Rules system, e.g. "5e" or "pf2e"
    #[serde(default)]
    pub game_system: Option<String>,
    #[serde(default)]
    pub party_level: Option<u8>,
    #[serde(default)]
    pub party_size: Option<u8>,
}

impl GenerationContext {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_game_system(mut self, system: impl Into<String>) -> Self {
        self.game_system = Some(system.into());
        self
    }

    pub fn with_party(mut self, level: u8, size: u8) -> Self {
        self.party_level = Some(level);
        self.party_size = Some(size);
        self
    }
}

/// Everything a stage reads. Shared read-only across concurrent stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementInput {
    pub content: ContentItem,
    pub context: GenerationContext,
}

impl EnhancementInput {
    pub fn new(content: ContentItem, context: GenerationContext) -> Self {
        Self { content, context }
    }
}

/// Per-call options handed to `execute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOptions {
    pub performance_mode: PerformanceMode,
    pub session_id: String,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            performance_mode: PerformanceMode::Balanced,
            session_id: String::new(),
        }
    }
}

/// What a stage produced: its typed result as JSON plus a self-reported
/// quality signal in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub payload: serde_json::Value,
    pub quality_signal: f64,
}

impl StageOutput {
    /// Wrap a typed result. The signal is clamped to [0, 100].
    pub fn from_typed<T: Serialize>(result: &T, quality_signal: f64) -> Result<Self, StageError> {
        let payload = serde_json::to_value(result)
            .map_err(|e| StageError::ExecutionFailure(format!("cannot encode output: {}", e)))?;
        Ok(Self {
            payload,
            quality_signal: clamp_score(quality_signal),
        })
    }
}

/// Errors captured at the stage boundary. None of these escape the
/// orchestrator in graceful mode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("execution failed: {0}")]
    ExecutionFailure(String),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl From<crate::backend::BackendError> for StageError {
    fn from(err: crate::backend::BackendError) -> Self {
        match err {
            crate::backend::BackendError::Unavailable(msg) => Self::AdapterUnavailable(msg),
            other => Self::ExecutionFailure(other.to_string()),
        }
    }
}

/// Clamp a score into [0, 100], mapping NaN to 0.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
