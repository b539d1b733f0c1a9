//! Bounded cache of finished runs, keyed by session id.

use crate::pipeline::Enhancement;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Reports kept by a server before the oldest are evicted
pub const DEFAULT_REPORT_CAPACITY: usize = 64;

/// Session reports with oldest-first eviction once `capacity` is exceeded.
pub struct ReportCache {
    entries: DashMap<String, Enhancement>,
    /// Insertion order, oldest first; one entry per cached session
    order: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl ReportCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// File a report. Re-filing a session replaces it and makes it newest.
    pub fn insert(&self, enhancement: Enhancement) {
        let session_id = enhancement.session_id.clone();
        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        if self.entries.insert(session_id.clone(), enhancement).is_some() {
            order.retain(|id| id != &session_id);
        }
        order.push_back(session_id);
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!(session = %oldest, "evicted cached report");
            }
        }
    }

    pub fn get(&self, session_id: &str) -> Option<Enhancement> {
        self.entries.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ContentItem, ContentKind};
    use crate::pipeline::ProcessingReport;
    use crate::quality::{Grade, QualityMetricsEngine};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn enhancement(session_id: &str) -> Enhancement {
        let report = ProcessingReport::from_results(vec![], Duration::ZERO, "test");
        let assessment = QualityMetricsEngine::new().assess(&report);
        Enhancement {
            session_id: session_id.to_string(),
            created_at: chrono::Utc::now(),
            original_content: ContentItem::new(ContentKind::Other, "t", "body"),
            stage_outputs: BTreeMap::new(),
            quality_metrics: assessment.metrics,
            grade: assessment.grade,
            breakdown: assessment.breakdown,
            processing_time: Duration::ZERO,
            stages_applied: vec![],
            report,
        }
    }

    #[test]
    fn filling_past_capacity_evicts_oldest() {
        let cache = ReportCache::new(3);
        for i in 0..5 {
            cache.insert(enhancement(&format!("s{}", i)));
        }

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("s0"));
        assert!(!cache.contains("s1"));
        assert!(cache.contains("s2"));
        assert!(cache.contains("s4"));
        assert_eq!(cache.get("s4").unwrap().grade, Grade::Standard);
    }

    #[test]
    fn refiling_a_session_refreshes_it() {
        let cache = ReportCache::new(2);
        cache.insert(enhancement("a"));
        cache.insert(enhancement("b"));
        cache.insert(enhancement("a"));
        cache.insert(enhancement("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let cache = ReportCache::new(0);
        cache.insert(enhancement("only"));
        assert!(cache.contains("only"));
        assert_eq!(cache.len(), 1);
    }
}
