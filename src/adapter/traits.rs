//! EnhancementAdapter trait: the contract every stage implements
//!
//! Implementors supply only the stage-specific pieces. The uniform
//! lifecycle (error swallowing, idempotent setup, validation gate, timing,
//! metrics) lives in `AdapterDescriptor`.

use super::stage::StageId;
use super::types::{EnhancementInput, StageError, StageOptions, StageOutput};
use async_trait::async_trait;

/// The contract enhancement stages implement.
///
/// # Example
///
/// ```ignore
/// struct WordCounter;
///
/// #[async_trait]
/// impl EnhancementAdapter for WordCounter {
///     fn stage(&self) -> StageId { StageId::EditorialExcellence }
///     fn validate(&self, input: &EnhancementInput) -> bool { !input.content.is_blank() }
///     async fn enhance(
///         &self,
///         input: &EnhancementInput,
///         _options: &StageOptions,
///     ) -> Result<StageOutput, StageError> {
///         let words = input.content.word_count();
///         StageOutput::from_typed(&serde_json::json!({ "words": words }), 75.0)
///     }
/// }
/// ```
#[async_trait]
pub trait EnhancementAdapter: Send + Sync {
    /// Which stage this adapter implements
    fn stage(&self) -> StageId;

    /// Implementation version
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Cheap availability check. Errors are treated as "unavailable".
    async fn check_available(&self) -> Result<bool, StageError> {
        Ok(true)
    }

    /// One-time setup, called at most once successfully.
    async fn setup(&self) -> Result<(), StageError> {
        Ok(())
    }

    /// Precondition check. Must not have side effects.
    fn validate(&self, input: &EnhancementInput) -> bool;

    /// Produce the enrichment. Only called after `validate` passed.
    async fn enhance(
        &self,
        input: &EnhancementInput,
        options: &StageOptions,
    ) -> Result<StageOutput, StageError>;
}
