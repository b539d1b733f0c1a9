//! Quality metrics engine
//!
//! Folds a run's stage results into five sub-scores, a composite impact
//! score and a grade. Pure: the same report always scores the same.

use super::types::{
    ComparativeBreakdown, Grade, ImpactBreakdown, MarketPosition, QualityAssessment,
    QualityBreakdown, QualityMetrics,
};
use crate::adapter::{clamp_score, StageId};
use crate::pipeline::ProcessingReport;

/// Every sub-score starts here before stage contributions
pub const BASE_SUB_SCORE: f64 = 75.0;
/// Every impact category starts here before stage bonuses
pub const BASE_IMPACT: f64 = 60.0;
/// Share of the feature success rate added to professional readiness
pub const READINESS_SUCCESS_WEIGHT: f64 = 0.25;

pub const BENCHMARK_STANDARD: f64 = 70.0;
pub const BENCHMARK_AVERAGE: f64 = 78.0;
pub const BENCHMARK_PREMIUM: f64 = 90.0;

const STRENGTH_THRESHOLD: f64 = 90.0;
const IMPROVEMENT_THRESHOLD: f64 = 85.0;

/// Sub-score weights: content, mechanical, editorial, ux, readiness
fn sub_score_weights(stage: StageId) -> [f64; 5] {
    match stage {
        StageId::PromptAnalysis => [1.0, 0.0, 0.0, 0.3, 0.0],
        StageId::MultiSolutionPuzzles => [1.0, 0.0, 0.0, 0.5, 0.0],
        StageId::NpcEnhancement => [1.0, 0.0, 0.0, 0.0, 0.0],
        StageId::TacticalCombat => [0.3, 1.0, 0.0, 0.0, 0.0],
        StageId::MechanicalValidation => [0.0, 1.2, 0.0, 0.0, 0.5],
        StageId::ProfessionalLayout => [0.0, 0.0, 0.8, 1.0, 0.5],
        StageId::EditorialExcellence => [0.0, 0.0, 1.2, 0.0, 0.3],
        StageId::Accessibility => [0.0, 0.0, 0.3, 1.0, 0.0],
    }
}

/// Maximum impact bonus per category: distinctiveness, memorability,
/// shareability, originality, intensity
fn impact_bonuses(stage: StageId) -> [f64; 5] {
    match stage {
        StageId::PromptAnalysis => [40.0, 0.0, 0.0, 0.0, 0.0],
        StageId::MultiSolutionPuzzles => [0.0, 30.0, 0.0, 40.0, 0.0],
        StageId::NpcEnhancement => [35.0, 40.0, 0.0, 0.0, 0.0],
        StageId::TacticalCombat => [0.0, 0.0, 0.0, 0.0, 40.0],
        StageId::ProfessionalLayout => [0.0, 0.0, 40.0, 0.0, 0.0],
        StageId::EditorialExcellence => [20.0, 0.0, 30.0, 0.0, 0.0],
        StageId::Accessibility => [0.0, 0.0, 25.0, 0.0, 0.0],
        StageId::MechanicalValidation => [0.0; 5],
    }
}

const IMPACT_WEIGHTS: [f64; 5] = [0.25, 0.25, 0.15, 0.20, 0.15];

/// Scores pipeline runs.
#[derive(Debug, Clone, Default)]
pub struct QualityMetricsEngine;

impl QualityMetricsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score a finished run from its report.
    pub fn assess(&self, report: &ProcessingReport) -> QualityAssessment {
        let features_success_rate = match report.enabled_steps() {
            0 => 0.0,
            enabled => report.completed_steps as f64 / enabled as f64 * 100.0,
        };

        let mut sub = [BASE_SUB_SCORE; 5];
        for result in report.step_details.iter().filter(|r| r.is_completed()) {
            for (score, weight) in sub.iter_mut().zip(sub_score_weights(result.stage)) {
                *score += result.quality_impact * weight;
            }
        }
        sub[4] += features_success_rate * READINESS_SUCCESS_WEIGHT;
        let sub = sub.map(clamp_score);

        let impact = self.impact(report);
        let impact_score = clamp_score(
            [
                impact.distinctiveness,
                impact.memorability,
                impact.shareability,
                impact.originality,
                impact.intensity,
            ]
            .iter()
            .zip(IMPACT_WEIGHTS)
            .map(|(value, weight)| value * weight)
            .sum(),
        );

        let metrics = QualityMetrics {
            content_quality: sub[0],
            mechanical_accuracy: sub[1],
            editorial_standards: sub[2],
            user_experience: sub[3],
            professional_readiness: sub[4],
            overall_score: clamp_score(sub.iter().sum::<f64>() / sub.len() as f64),
            impact_score,
            features_success_rate,
        };

        QualityAssessment {
            grade: grade_for(metrics.overall_score, metrics.impact_score),
            breakdown: QualityBreakdown {
                strengths: strengths(&metrics),
                improvements: improvements(&metrics),
                comparative: compare(metrics.overall_score),
                impact,
            },
            metrics,
        }
    }

    /// Each category takes the largest bonus any completed stage offers.
    fn impact(&self, report: &ProcessingReport) -> ImpactBreakdown {
        let mut best = [0.0_f64; 5];
        for result in &report.step_details {
            let Some(signal) = result.quality_signal().filter(|_| result.is_completed()) else {
                continue;
            };
            for (slot, bonus) in best.iter_mut().zip(impact_bonuses(result.stage)) {
                *slot = slot.max(bonus * clamp_score(signal) / 100.0);
            }
        }
        let value = |i: usize| clamp_score(BASE_IMPACT + best[i]);
        ImpactBreakdown {
            distinctiveness: value(0),
            memorability: value(1),
            shareability: value(2),
            originality: value(3),
            intensity: value(4),
        }
    }
}

/// Grade on the better of the overall score and discounted impact.
pub fn grade_for(overall: f64, impact: f64) -> Grade {
    let score = overall.max(impact * 0.8);
    if score >= 99.0 && impact >= 95.0 {
        Grade::TopTier
    } else if score >= 95.0 {
        Grade::PublicationReady
    } else if score >= 90.0 {
        Grade::Premium
    } else if score >= 80.0 {
        Grade::Professional
    } else {
        Grade::Standard
    }
}

fn strengths(metrics: &QualityMetrics) -> Vec<String> {
    metrics
        .sub_scores()
        .iter()
        .filter(|(_, score)| *score >= STRENGTH_THRESHOLD)
        .map(|(label, score)| format!("Strong {} ({:.0}/100)", label, score))
        .collect()
}

fn improvements(metrics: &QualityMetrics) -> Vec<String> {
    metrics
        .sub_scores()
        .iter()
        .filter(|(_, score)| *score < IMPROVEMENT_THRESHOLD)
        .map(|(label, score)| format!("Improve {} (currently {:.0}/100)", label, score))
        .collect()
}

fn compare(overall: f64) -> ComparativeBreakdown {
    let market_position = if overall >= BENCHMARK_PREMIUM {
        MarketPosition::MarketLeading
    } else if overall >= BENCHMARK_AVERAGE {
        MarketPosition::AboveAverage
    } else if overall >= BENCHMARK_STANDARD {
        MarketPosition::IndustryStandard
    } else {
        MarketPosition::BelowStandard
    };
    ComparativeBreakdown {
        vs_standard: overall - BENCHMARK_STANDARD,
        vs_average: overall - BENCHMARK_AVERAGE,
        vs_premium: overall - BENCHMARK_PREMIUM,
        market_position,
    }
}
