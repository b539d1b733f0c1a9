//! Editorial pass
//!
//! Readability, sentence length, doubled words and passive constructions.

use crate::adapter::{
    EnhancementAdapter, EnhancementInput, StageError, StageId, StageOptions, StageOutput,
};
use crate::backend::{decode, EnrichmentBackend, EnrichmentRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Below this many words there is nothing to edit
pub const MIN_EDITABLE_WORDS: usize = 10;

/// Typed result of the editorial stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorialReview {
    pub word_count: usize,
    pub sentence_count: usize,
    pub average_sentence_length: f64,
    pub long_sentences: usize,
    /// Flesch reading ease
    pub readability: f64,
    #[serde(default)]
    pub repeated_words: Vec<String>,
    pub passive_constructions: usize,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl EditorialReview {
    pub fn quality(&self) -> f64 {
        let readability = self.readability.clamp(0.0, 100.0);
        let penalties = 5.0 * self.long_sentences as f64
            + 5.0 * self.repeated_words.len() as f64
            + 2.0 * self.passive_constructions as f64;
        (50.0 + readability * 0.5 - penalties).clamp(0.0, 100.0)
    }
}

pub struct EditorialExcellenceAdapter {
    backend: Arc<dyn EnrichmentBackend>,
}

impl EditorialExcellenceAdapter {
    pub fn new(backend: Arc<dyn EnrichmentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EnhancementAdapter for EditorialExcellenceAdapter {
    fn stage(&self) -> StageId {
        StageId::EditorialExcellence
    }

    async fn check_available(&self) -> Result<bool, StageError> {
        Ok(self.backend.is_available().await)
    }

    fn validate(&self, input: &EnhancementInput) -> bool {
        input.content.word_count() >= MIN_EDITABLE_WORDS
    }

    async fn enhance(
        &self,
        input: &EnhancementInput,
        options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        let request = EnrichmentRequest::new(self.stage(), input, options);
        let review: EditorialReview = decode(self.backend.produce(&request).await?)?;
        StageOutput::from_typed(&review, review.quality())
    }
}
