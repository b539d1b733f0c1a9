//! Quality scoring for pipeline runs

mod engine;
mod types;

pub use engine::{
    grade_for, QualityMetricsEngine, BASE_IMPACT, BASE_SUB_SCORE, BENCHMARK_AVERAGE,
    BENCHMARK_PREMIUM, BENCHMARK_STANDARD, READINESS_SUCCESS_WEIGHT,
};
pub use types::{
    ComparativeBreakdown, Grade, ImpactBreakdown, MarketPosition, QualityAssessment,
    QualityBreakdown, QualityMetrics,
};
