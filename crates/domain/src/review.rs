//! Review-derived entities (§3, §4.9-§4.10): DefectSignal, FeatureRequest
//! and the per-listing ImprovementProfile they roll up into.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Closed set of defect tags for the target vertical (§4.9). Mirrors the
/// nine-plus-other set the review extractor's lexicon is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "defect_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DefectType {
    MechanicalFailure,
    PoorGrip,
    InstallationIssue,
    CompatibilityIssue,
    MaterialQuality,
    VibrationNoise,
    HeatIssue,
    SizeFit,
    Durability,
    Other,
}

impl DefectType {
    pub const ALL: [DefectType; 10] = [
        DefectType::MechanicalFailure,
        DefectType::PoorGrip,
        DefectType::InstallationIssue,
        DefectType::CompatibilityIssue,
        DefectType::MaterialQuality,
        DefectType::VibrationNoise,
        DefectType::HeatIssue,
        DefectType::SizeFit,
        DefectType::Durability,
        DefectType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DefectType::MechanicalFailure => "mechanical_failure",
            DefectType::PoorGrip => "poor_grip",
            DefectType::InstallationIssue => "installation_issue",
            DefectType::CompatibilityIssue => "compatibility_issue",
            DefectType::MaterialQuality => "material_quality",
            DefectType::VibrationNoise => "vibration_noise",
            DefectType::HeatIssue => "heat_issue",
            DefectType::SizeFit => "size_fit",
            DefectType::Durability => "durability",
            DefectType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DefectSignal {
    pub defect_type: DefectType,
    pub frequency: i32,
    pub severity_score: f64,
    /// Up to three verbatim example quotes (§3).
    pub example_quotes: Vec<String>,
    pub total_reviews_scanned: i32,
    pub negative_reviews_scanned: i32,
}

impl DefectSignal {
    pub fn frequency_rate(&self) -> f64 {
        if self.negative_reviews_scanned == 0 {
            0.0
        } else {
            self.frequency as f64 / self.negative_reviews_scanned as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeatureRequest {
    /// Normalized feature key (lower-case, stop words removed, synonyms
    /// collapsed).
    pub feature: String,
    pub mentions: i32,
    pub confidence: f64,
    pub source_quotes: Vec<String>,
    pub helpful_votes: i64,
    pub wish_strength: f64,
}

impl FeatureRequest {
    pub fn compute_wish_strength(mentions: i32, helpful_votes: i64) -> f64 {
        mentions as f64 + (helpful_votes as f64).ln_1p()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementProfile {
    pub listing_id: String,
    pub top_defects: Vec<DefectSignal>,
    pub top_feature_requests: Vec<FeatureRequest>,
    pub dominant_pain: Option<DefectType>,
    pub improvement_score: f64,
    pub reviews_analyzed: i32,
    pub negative_reviews_analyzed: i32,
    pub reviews_ready: bool,
}

impl ImprovementProfile {
    pub fn empty(listing_id: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            top_defects: Vec::new(),
            top_feature_requests: Vec::new(),
            dominant_pain: None,
            improvement_score: 0.0,
            reviews_analyzed: 0,
            negative_reviews_analyzed: 0,
            reviews_ready: false,
        }
    }

    pub fn has_actionable_insights(&self) -> bool {
        self.top_defects.iter().any(|d| d.severity_score > 0.3)
    }
}

/// A single raw review row as returned by the review provider (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReview {
    pub review_id: String,
    pub body: String,
    pub rating: i32,
    pub title: Option<String>,
    pub date: chrono::DateTime<chrono::Utc>,
    pub helpful_votes: i64,
}

impl RawReview {
    pub fn is_negative(&self) -> bool {
        self.rating <= 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_rate_zero_denominator() {
        let signal = DefectSignal {
            defect_type: DefectType::Durability,
            frequency: 0,
            severity_score: 0.0,
            example_quotes: vec![],
            total_reviews_scanned: 10,
            negative_reviews_scanned: 0,
        };
        assert_eq!(signal.frequency_rate(), 0.0);
    }

    #[test]
    fn test_wish_strength() {
        let strength = FeatureRequest::compute_wish_strength(4, 10);
        assert!((strength - (4.0 + 10f64.ln_1p())).abs() < 1e-9);
    }

    #[test]
    fn test_empty_profile_not_ready() {
        let profile = ImprovementProfile::empty("L1");
        assert_eq!(profile.improvement_score, 0.0);
        assert!(!profile.reviews_ready);
    }
}
