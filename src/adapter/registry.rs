//! Registry of enhancement adapters keyed by stage
//!
//! Read-mostly once `initialize_all()` completes; share it behind an `Arc`
//! across concurrent pipeline runs.

use super::descriptor::AdapterDescriptor;
use super::health::{FeatureMetrics, HealthStatus};
use super::stage::StageId;
use super::traits::EnhancementAdapter;
use crate::backend::EnrichmentBackend;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};

/// Initialization is considered acceptable above this success ratio.
pub const ACCEPTABLE_INIT_RATIO: f64 = 0.5;

/// Errors from registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("adapter already registered: {0}")]
    DuplicateName(StageId),

    #[error("adapter not found: {0}")]
    NotFound(String),
}

/// Outcome of `initialize_all()`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitializationSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Stages whose setup failed (or whose setup task panicked)
    pub failed: Vec<StageId>,
}

impl InitializationSummary {
    /// Fraction of adapters that initialized; 0 for an empty registry.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.ratio() > ACCEPTABLE_INIT_RATIO
    }
}

/// Holds one descriptor per stage.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<StageId, Arc<AdapterDescriptor>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the eight built-in stages, all sharing `backend`.
    pub fn with_builtin_adapters(backend: Arc<dyn EnrichmentBackend>) -> Self {
        let mut registry = Self::new();
        for adapter in crate::stages::builtin_adapters(backend) {
            // Built-ins cover each stage exactly once
            let stage = adapter.stage();
            if let Err(e) = registry.register(adapter) {
                tracing::error!(%stage, error = %e, "built-in adapter collision");
            }
        }
        registry
    }

    /// Register an adapter under its stage. Fails if the stage is taken.
    pub fn register(&mut self, adapter: Arc<dyn EnhancementAdapter>) -> Result<(), RegistryError> {
        let stage = adapter.stage();
        if self.adapters.contains_key(&stage) {
            return Err(RegistryError::DuplicateName(stage));
        }
        self.adapters
            .insert(stage, Arc::new(AdapterDescriptor::new(adapter)));
        Ok(())
    }

    /// Look up the descriptor for a stage
    pub fn get(&self, stage: StageId) -> Result<Arc<AdapterDescriptor>, RegistryError> {
        self.adapters
            .get(&stage)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(stage.to_string()))
    }

    /// Look up by wire name, e.g. `"tactical-combat"`
    pub fn get_by_name(&self, name: &str) -> Result<Arc<AdapterDescriptor>, RegistryError> {
        let stage: StageId = name
            .parse()
            .map_err(|_| RegistryError::NotFound(name.to_string()))?;
        self.get(stage)
    }

    pub fn contains(&self, stage: StageId) -> bool {
        self.adapters.contains_key(&stage)
    }

    /// Registered stages in declaration order
    pub fn stages(&self) -> Vec<StageId> {
        self.adapters.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Initialize every adapter concurrently and wait for all of them.
    pub async fn initialize_all(&self) -> InitializationSummary {
        // One handle per stage so a panicked setup is still attributed
        let handles: Vec<(StageId, JoinHandle<bool>)> = self
            .adapters
            .iter()
            .map(|(stage, descriptor)| {
                let descriptor = Arc::clone(descriptor);
                (*stage, tokio::spawn(async move { descriptor.initialize().await }))
            })
            .collect();

        let mut succeeded = 0;
        let mut failed = Vec::new();
        for (stage, handle) in handles {
            match handle.await {
                Ok(true) => succeeded += 1,
                Ok(false) => failed.push(stage),
                Err(e) => {
                    tracing::warn!(%stage, error = %e, "adapter initialization task panicked");
                    failed.push(stage);
                }
            }
        }

        let summary = InitializationSummary {
            total: self.adapters.len(),
            succeeded,
            failed,
        };
        if summary.is_acceptable() {
            tracing::info!(
                succeeded = summary.succeeded,
                total = summary.total,
                "adapters initialized"
            );
        } else {
            tracing::warn!(
                succeeded = summary.succeeded,
                total = summary.total,
                failed = ?summary.failed,
                "too few adapters initialized"
            );
        }
        summary
    }

    /// Check every adapter concurrently; return those reporting available.
    pub async fn list_available(&self) -> BTreeSet<StageId> {
        let mut tasks = JoinSet::new();
        for descriptor in self.adapters.values() {
            let descriptor = Arc::clone(descriptor);
            tasks.spawn(async move { (descriptor.stage(), descriptor.is_available().await) });
        }

        let mut available = BTreeSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((stage, true)) => {
                    available.insert(stage);
                }
                Ok((_, false)) => {}
                Err(e) => tracing::debug!(error = %e, "availability check task panicked"),
            }
        }
        available
    }

    /// Health of every registered adapter
    pub fn health_snapshot(&self) -> BTreeMap<StageId, HealthStatus> {
        self.adapters
            .iter()
            .map(|(stage, d)| (*stage, d.health_status()))
            .collect()
    }

    /// Metrics of every registered adapter
    pub fn metrics_snapshot(&self) -> BTreeMap<StageId, FeatureMetrics> {
        self.adapters
            .iter()
            .map(|(stage, d)| (*stage, d.metrics()))
            .collect()
    }
}
