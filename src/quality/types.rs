//! Quality assessment types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Five sub-scores plus composites, all in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub content_quality: f64,
    pub mechanical_accuracy: f64,
    pub editorial_standards: f64,
    pub user_experience: f64,
    pub professional_readiness: f64,
    /// Equal-weight mean of the five sub-scores
    pub overall_score: f64,
    pub impact_score: f64,
    /// Completed stages over enabled stages, as a percentage
    pub features_success_rate: f64,
}

impl QualityMetrics {
    /// The five sub-scores with display labels, in a fixed order.
    pub fn sub_scores(&self) -> [(&'static str, f64); 5] {
        [
            ("content quality", self.content_quality),
            ("mechanical accuracy", self.mechanical_accuracy),
            ("editorial standards", self.editorial_standards),
            ("user experience", self.user_experience),
            ("professional readiness", self.professional_readiness),
        ]
    }
}

/// Discrete quality tier, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    Standard,
    Professional,
    Premium,
    #[serde(rename = "Publication-Ready")]
    PublicationReady,
    #[serde(rename = "Top-Tier")]
    TopTier,
}

impl Grade {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Professional => "Professional",
            Self::Premium => "Premium",
            Self::PublicationReady => "Publication-Ready",
            Self::TopTier => "Top-Tier",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-category impact values behind `impact_score`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactBreakdown {
    pub distinctiveness: f64,
    pub memorability: f64,
    pub shareability: f64,
    pub originality: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketPosition {
    #[serde(rename = "Below Standard")]
    BelowStandard,
    #[serde(rename = "Industry Standard")]
    IndustryStandard,
    #[serde(rename = "Above Average")]
    AboveAverage,
    #[serde(rename = "Market Leading")]
    MarketLeading,
}

impl MarketPosition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BelowStandard => "Below Standard",
            Self::IndustryStandard => "Industry Standard",
            Self::AboveAverage => "Above Average",
            Self::MarketLeading => "Market Leading",
        }
    }
}

impl fmt::Display for MarketPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall score against fixed market benchmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparativeBreakdown {
    pub vs_standard: f64,
    pub vs_average: f64,
    pub vs_premium: f64,
    pub market_position: MarketPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub comparative: ComparativeBreakdown,
    pub impact: ImpactBreakdown,
}

/// Everything the engine derives from one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub metrics: QualityMetrics,
    pub grade: Grade,
    pub breakdown: QualityBreakdown,
}
