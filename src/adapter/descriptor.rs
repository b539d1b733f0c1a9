//! AdapterDescriptor: identity, lifecycle and bookkeeping around one adapter
//!
//! The descriptor is what the registry stores and what the orchestrator
//! talks to. It turns an `EnhancementAdapter` into the uniform capability
//! contract: availability never errors, initialization is idempotent,
//! execution is gated on validation and always recorded.

use super::health::{FeatureMetrics, HealthStatus, MetricsTracker};
use super::stage::StageId;
use super::traits::EnhancementAdapter;
use super::types::{EnhancementInput, StageError, StageOptions, StageOutput};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// A registered adapter with its lifecycle state and metrics.
pub struct AdapterDescriptor {
    stage: StageId,
    version: String,
    initialized: AtomicBool,
    /// Serializes concurrent `initialize()` calls
    init_lock: Mutex<()>,
    adapter: Arc<dyn EnhancementAdapter>,
    tracker: MetricsTracker,
}

impl std::fmt::Debug for AdapterDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterDescriptor")
            .field("stage", &self.stage)
            .field("version", &self.version)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl AdapterDescriptor {
    pub fn new(adapter: Arc<dyn EnhancementAdapter>) -> Self {
        Self {
            stage: adapter.stage(),
            version: adapter.version().to_string(),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            adapter,
            tracker: MetricsTracker::new(),
        }
    }

    pub fn stage(&self) -> StageId {
        self.stage
    }

    pub fn name(&self) -> &'static str {
        self.stage.as_str()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Whether the adapter can run right now. Check errors count as `false`.
    pub async fn is_available(&self) -> bool {
        match self.adapter.check_available().await {
            Ok(available) => available,
            Err(e) => {
                tracing::debug!(stage = %self.stage, error = %e, "availability check failed");
                false
            }
        }
    }

    /// Run setup once. Later calls return `true` without re-running it.
    /// A failed setup is recorded in health errors and may be retried.
    pub async fn initialize(&self) -> bool {
        if self.is_initialized() {
            return true;
        }
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            return true;
        }

        match self.adapter.setup().await {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                tracing::debug!(
                    stage = %self.stage,
                    version = %self.version,
                    "adapter initialized"
                );
                true
            }
            Err(e) => {
                tracing::warn!(stage = %self.stage, error = %e, "adapter initialization failed");
                self.tracker.record_error(format!("initialization failed: {}", e));
                false
            }
        }
    }

    /// Side-effect-free precondition check.
    pub fn validate(&self, input: &EnhancementInput) -> bool {
        self.adapter.validate(input)
    }

    /// Validate then enhance, recording the outcome and elapsed time.
    pub async fn execute(
        &self,
        input: &EnhancementInput,
        options: &StageOptions,
    ) -> Result<StageOutput, StageError> {
        let started = Instant::now();

        if !self.validate(input) {
            let err = StageError::InvalidInput(format!(
                "{} rejected the {} content",
                self.stage,
                input.content.kind.as_str()
            ));
            self.tracker.record_failure(started.elapsed(), err.to_string());
            return Err(err);
        }

        match self.adapter.enhance(input, options).await {
            Ok(output) => {
                self.tracker
                    .record_success(started.elapsed(), output.quality_signal);
                Ok(output)
            }
            Err(e) => {
                self.tracker.record_failure(started.elapsed(), e.to_string());
                Err(e)
            }
        }
    }

    /// Record a failure that happened outside `execute` (timeout, task
    /// panic, unavailability) so it still counts against the adapter.
    pub fn record_failure(&self, elapsed: Duration, error: &StageError) {
        self.tracker.record_failure(elapsed, error.to_string());
    }

    /// Store the impact derived for the latest successful run.
    pub fn record_impact(&self, impact_score: f64) {
        self.tracker.set_impact(impact_score);
    }

    pub fn health_status(&self) -> HealthStatus {
        self.tracker.health()
    }

    pub fn metrics(&self) -> FeatureMetrics {
        self.tracker.metrics()
    }
}
