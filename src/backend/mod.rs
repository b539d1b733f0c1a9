//! Enrichment backends: where stages get their raw enrichment from
//!
//! Defines the backend trait and the request/error types. Two
//! implementations:
//! - `HeuristicBackend`: deterministic local analysis of the markdown body
//! - `MockBackend`: preconfigured per-stage responses (testing)
//!
//! Stages never depend on how a backend reaches its data; an AI service
//! client implements the same trait.

mod heuristic;
mod profile;

pub use heuristic::HeuristicBackend;
pub use profile::{parse_dice, DiceExpr, DocumentProfile, Section};

use crate::adapter::{EnhancementInput, StageId, StageOptions};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// One enrichment call: which stage is asking, about what, and how.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentRequest<'a> {
    pub stage: StageId,
    pub input: &'a EnhancementInput,
    pub options: &'a StageOptions,
}

impl<'a> EnrichmentRequest<'a> {
    pub fn new(stage: StageId, input: &'a EnhancementInput, options: &'a StageOptions) -> Self {
        Self {
            stage,
            input,
            options,
        }
    }
}

/// Errors from backend calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("backend not available: {0}")]
    Unavailable(String),
    #[error("stage not supported by backend: {0}")]
    Unsupported(StageId),
    #[error("invocation failed: {0}")]
    InvocationFailed(String),
    #[error("response parse error: {0}")]
    ParseError(String),
}

/// Source of raw enrichment for a stage.
///
/// Responses are JSON in the shape the requesting stage documents; the
/// stage parses and scores them.
#[async_trait]
pub trait EnrichmentBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Check if the backend is reachable.
    async fn is_available(&self) -> bool;

    /// Produce raw enrichment for one stage.
    async fn produce(
        &self,
        request: &EnrichmentRequest<'_>,
    ) -> Result<serde_json::Value, BackendError>;
}

/// Decode a backend response into a stage's typed result.
pub fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::ParseError(e.to_string()))
}

/// Mock backend for testing: returns preconfigured responses.
pub struct MockBackend {
    available: bool,
    responses: HashMap<StageId, Result<serde_json::Value, BackendError>>,
    delays: HashMap<StageId, Duration>,
}

impl MockBackend {
    /// Create a mock backend that reports as available.
    pub fn available() -> Self {
        Self {
            available: true,
            responses: HashMap::new(),
            delays: HashMap::new(),
        }
    }

    /// Create a mock backend that reports as unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// Register a response for a stage.
    pub fn with_response(mut self, stage: StageId, response: serde_json::Value) -> Self {
        self.responses.insert(stage, Ok(response));
        self
    }

    /// Register a failure for a stage.
    pub fn with_failure(mut self, stage: StageId, error: BackendError) -> Self {
        self.responses.insert(stage, Err(error));
        self
    }

    /// Delay responses for a stage.
    pub fn with_delay(mut self, stage: StageId, delay: Duration) -> Self {
        self.delays.insert(stage, delay);
        self
    }
}

#[async_trait]
impl EnrichmentBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn produce(
        &self,
        request: &EnrichmentRequest<'_>,
    ) -> Result<serde_json::Value, BackendError> {
        if !self.available {
            return Err(BackendError::Unavailable(
                "mock backend configured as unavailable".to_string(),
            ));
        }
        if let Some(delay) = self.delays.get(&request.stage) {
            tokio::time::sleep(*delay).await;
        }
        match self.responses.get(&request.stage) {
            Some(response) => response.clone(),
            None => Err(BackendError::Unsupported(request.stage)),
        }
    }
}
