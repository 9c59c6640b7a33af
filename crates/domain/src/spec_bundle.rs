//! SpecBundle (§3, §4.11): the deterministic OEM spec + QC checklist +
//! supplier-outreach triad rendered from an [`crate::review::ImprovementProfile`].
//! Reproducibility invariant: bundles with identical `inputs_hash` and
//! `mapping_version` render byte-identically (§8).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "oem_priority", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OemPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl OemPriority {
    /// Priority derived from severity/normalized-wish-strength (§4.11).
    pub fn from_score(score: f64) -> OemPriority {
        if score >= 0.75 {
            OemPriority::Critical
        } else if score >= 0.5 {
            OemPriority::High
        } else if score >= 0.25 {
            OemPriority::Medium
        } else {
            OemPriority::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "qc_priority", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum QcPriority {
    Recommended,
    Mandatory,
}

/// Which bloc of the OEM spec a requirement belongs to: A (defect fixes,
/// severity-ordered) or B (feature additions, wish-strength-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecBloc {
    A,
    B,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OemRequirement {
    pub bloc: SpecBloc,
    pub source: String,
    pub requirement: String,
    pub material_spec: Option<String>,
    pub tolerance: Option<String>,
    pub priority: OemPriority,
    pub ordering_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcTestItem {
    pub category: String,
    pub test_name: String,
    pub method: String,
    pub pass_criterion: String,
    pub priority: QcPriority,
    pub source_defect: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecBundle {
    pub listing_id: String,
    pub run_id: Option<String>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub bloc_a: Vec<OemRequirement>,
    pub bloc_b: Vec<OemRequirement>,
    pub qc_checklist: Vec<QcTestItem>,
    pub oem_spec_text: String,
    pub qc_checklist_text: String,
    pub supplier_outreach_subject: String,
    pub supplier_outreach_body: String,
    pub mapping_version: String,
    pub inputs_hash: String,
}

/// Minimal, field-sorted summary of the inputs that feed bundle rendering.
/// Hashing this (rather than the whole profile) keeps `inputs_hash` stable
/// across irrelevant profile fields (e.g. `reviews_analyzed` changing
/// without the defect/feature lists changing).
#[derive(Debug, Clone, Serialize)]
struct InputsSummary {
    defects: Vec<(String, i32, String)>,
    features: Vec<(String, i32, String)>,
}

/// `inputs_hash` = first 16 hex chars of SHA-256 over the canonical JSON of
/// the sorted (defect-list, feature-list) minimal summary (§4.11).
pub fn compute_inputs_hash(profile: &crate::review::ImprovementProfile) -> String {
    let mut defects: Vec<(String, i32, String)> = profile
        .top_defects
        .iter()
        .map(|d| {
            (
                d.defect_type.as_str().to_string(),
                d.frequency,
                format!("{:.6}", d.severity_score),
            )
        })
        .collect();
    defects.sort();

    let mut features: Vec<(String, i32, String)> = profile
        .top_feature_requests
        .iter()
        .map(|f| (f.feature.clone(), f.mentions, format!("{:.6}", f.wish_strength)))
        .collect();
    features.sort();

    let summary = InputsSummary { defects, features };
    let canonical = serde_json::to_vec(&summary).expect("InputsSummary always serializes");

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    let digest = hasher.finalize();
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{DefectSignal, DefectType, FeatureRequest, ImprovementProfile};

    fn sample_profile() -> ImprovementProfile {
        ImprovementProfile {
            listing_id: "L1".to_string(),
            top_defects: vec![DefectSignal {
                defect_type: DefectType::PoorGrip,
                frequency: 12,
                severity_score: 0.8,
                example_quotes: vec![],
                total_reviews_scanned: 100,
                negative_reviews_scanned: 20,
            }],
            top_feature_requests: vec![FeatureRequest {
                feature: "waterproof".to_string(),
                mentions: 4,
                confidence: 0.9,
                source_quotes: vec![],
                helpful_votes: 10,
                wish_strength: 5.4,
            }],
            dominant_pain: Some(DefectType::PoorGrip),
            improvement_score: 0.7,
            reviews_analyzed: 100,
            negative_reviews_analyzed: 20,
            reviews_ready: true,
        }
    }

    #[test]
    fn test_inputs_hash_is_16_lowercase_hex() {
        let hash = compute_inputs_hash(&sample_profile());
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn test_inputs_hash_deterministic() {
        let profile = sample_profile();
        assert_eq!(compute_inputs_hash(&profile), compute_inputs_hash(&profile));
    }

    #[test]
    fn test_oem_priority_bands() {
        assert_eq!(OemPriority::from_score(0.8), OemPriority::Critical);
        assert_eq!(OemPriority::from_score(0.6), OemPriority::High);
        assert_eq!(OemPriority::from_score(0.3), OemPriority::Medium);
        assert_eq!(OemPriority::from_score(0.1), OemPriority::Low);
    }
}
