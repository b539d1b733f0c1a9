//! Enhancement adapter layer
//!
//! An adapter is one pluggable enrichment stage. Implementors provide the
//! stage logic through `EnhancementAdapter`; the registry wraps each in an
//! `AdapterDescriptor` that enforces the shared lifecycle and keeps
//! per-adapter metrics.

mod descriptor;
mod health;
mod registry;
mod stage;
mod traits;
mod types;

pub use descriptor::AdapterDescriptor;
pub use health::{FeatureMetrics, HealthStatus, MetricsTracker};
pub(crate) use health::duration_millis;
pub use registry::{AdapterRegistry, InitializationSummary, RegistryError, ACCEPTABLE_INIT_RATIO};
pub use stage::{PipelineDefinition, StageId, UnknownStage, PIPELINE_VERSION};
pub use traits::EnhancementAdapter;
pub use types::{
    clamp_score, ContentItem, ContentKind, EnhancementInput, GenerationContext, StageError,
    StageOptions, StageOutput,
};
