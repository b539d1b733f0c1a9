//! Per-adapter execution metrics and derived health status
//!
//! Counters live behind a mutex: several pipeline runs may record into
//! the same adapter at once. Health is never stored, only derived on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Most recent errors kept per adapter
const ERROR_LOG_CAPACITY: usize = 20;
/// Health threshold on success rate (percent, exclusive)
const HEALTHY_SUCCESS_RATE: f64 = 80.0;
/// Health threshold on recorded errors (exclusive)
const MAX_HEALTHY_ERRORS: usize = 5;
/// Average execution time above which a warning is raised
const SLOW_EXECUTION: Duration = Duration::from_secs(5);

/// Running counters for one adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    #[serde(with = "duration_millis")]
    pub average_execution_time: Duration,
    #[serde(with = "duration_millis")]
    pub last_execution_time: Duration,
    /// Last observed quality signal, 0-100
    pub quality_score: f64,
    /// Last observed impact, 0-100
    pub impact_score: f64,
}

impl FeatureMetrics {
    /// Success percentage; 100 when nothing has run yet.
    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            100.0
        } else {
            self.successful_executions as f64 / self.total_executions as f64 * 100.0
        }
    }
}

/// Health of one adapter at the moment it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub last_check: DateTime<Utc>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(with = "duration_millis")]
    pub uptime: Duration,
    pub success_rate: f64,
}

#[derive(Debug, Default)]
struct TrackerState {
    metrics: FeatureMetrics,
    errors: VecDeque<String>,
}

/// Records executions for one adapter and derives its health.
#[derive(Debug)]
pub struct MetricsTracker {
    state: Mutex<TrackerState>,
    started: Instant,
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            started: Instant::now(),
        }
    }

    // A panic while holding the lock leaves plain counters behind; keep using them.
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a successful execution.
    pub fn record_success(&self, elapsed: Duration, quality_score: f64) {
        let mut state = self.lock();
        Self::record_timing(&mut state.metrics, elapsed);
        state.metrics.successful_executions += 1;
        state.metrics.quality_score = quality_score;
    }

    /// Record a failed execution. The elapsed time still counts.
    pub fn record_failure(&self, elapsed: Duration, error: impl Into<String>) {
        let mut state = self.lock();
        Self::record_timing(&mut state.metrics, elapsed);
        Self::push_error(&mut state, error.into());
    }

    /// Record an error that did not involve an execution (e.g. failed setup).
    pub fn record_error(&self, error: impl Into<String>) {
        let mut state = self.lock();
        Self::push_error(&mut state, error.into());
    }

    /// Store the impact the orchestrator derived for the latest success.
    pub fn set_impact(&self, impact_score: f64) {
        self.lock().metrics.impact_score = impact_score;
    }

    fn record_timing(metrics: &mut FeatureMetrics, elapsed: Duration) {
        metrics.total_executions += 1;
        let n = metrics.total_executions as f64;
        let avg = metrics.average_execution_time.as_secs_f64();
        let updated = (avg * (n - 1.0) + elapsed.as_secs_f64()) / n;
        metrics.average_execution_time = Duration::from_secs_f64(updated);
        metrics.last_execution_time = elapsed;
    }

    fn push_error(state: &mut TrackerState, error: String) {
        if state.errors.len() == ERROR_LOG_CAPACITY {
            state.errors.pop_front();
        }
        state.errors.push_back(error);
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> FeatureMetrics {
        self.lock().metrics.clone()
    }

    /// Derive health from the current counters.
    pub fn health(&self) -> HealthStatus {
        let state = self.lock();
        let success_rate = state.metrics.success_rate();
        let errors: Vec<String> = state.errors.iter().cloned().collect();
        let is_healthy = success_rate > HEALTHY_SUCCESS_RATE && errors.len() < MAX_HEALTHY_ERRORS;

        let mut warnings = Vec::new();
        if state.metrics.average_execution_time > SLOW_EXECUTION {
            warnings.push(format!(
                "average execution time {}ms exceeds {}ms",
                state.metrics.average_execution_time.as_millis(),
                SLOW_EXECUTION.as_millis()
            ));
        }
        if is_healthy && success_rate < 95.0 {
            warnings.push(format!("success rate degraded to {:.1}%", success_rate));
        }

        HealthStatus {
            is_healthy,
            last_check: Utc::now(),
            errors,
            warnings,
            uptime: self.started.elapsed(),
            success_rate,
        }
    }
}

/// Serialize durations as integer milliseconds.
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
