//! Lorecraft: Enhancement Pipeline for Generated Tabletop-RPG Content
//!
//! Takes a piece of generated content (an adventure, NPC, monster, puzzle
//! or encounter), runs a configurable set of independent enhancement stages
//! over it concurrently, isolates stage failures, and scores the result.
//!
//! # Core Concepts
//!
//! - **Stages**: Eight built-in enrichments, from prompt analysis to mechanical validation
//! - **Adapters**: One pluggable implementation per stage, wrapped with shared lifecycle and metrics
//! - **Quality**: Five sub-scores, an impact score and a grade derived from each run
//!
//! # Example
//!
//! ```
//! use lorecraft::{AdapterRegistry, EnhancementConfig, EnhancementPipeline, HeuristicBackend};
//! use std::sync::Arc;
//!
//! let registry = AdapterRegistry::with_builtin_adapters(Arc::new(HeuristicBackend::new()));
//! let pipeline = EnhancementPipeline::new(Arc::new(registry));
//! let config = EnhancementConfig::default();
//! assert_eq!(config.enabled_stages().unwrap().len(), pipeline.definition().len());
//! ```

pub mod adapter;
pub mod backend;
pub mod config;
pub mod mcp;
pub mod pipeline;
pub mod quality;
pub mod stages;

pub use adapter::{
    AdapterDescriptor, AdapterRegistry, ContentItem, ContentKind, EnhancementAdapter,
    EnhancementInput, FeatureMetrics, GenerationContext, HealthStatus, PipelineDefinition,
    RegistryError, StageError, StageId, StageOptions, StageOutput,
};
pub use backend::{BackendError, EnrichmentBackend, HeuristicBackend, MockBackend};
pub use config::{
    ConfigError, ConfigStore, EnhancementConfig, FallbackBehavior, OpenStore, PerformanceMode,
    SqliteConfigStore, StorageError, StorageResult,
};
pub use pipeline::{
    Enhancement, EnhancementPipeline, PipelineError, PipelineState, ProcessingReport,
    StageResult, StageStatus,
};
pub use quality::{Grade, QualityAssessment, QualityMetrics, QualityMetricsEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
