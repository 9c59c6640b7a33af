//! Spec bundle reproducibility (§4.11, S5): building the bundle twice from
//! an identical improvement profile must yield the same inputs-hash and
//! byte-identical rendered text, with defects ordered severity-desc and no
//! duplicate QC test names.

use smartacus_domain::{DefectSignal, DefectType, FeatureRequest, ImprovementProfile};
use smartacus_reviews::generate_spec_bundle;

fn two_defects_one_wish_profile() -> ImprovementProfile {
    ImprovementProfile {
        listing_id: "B0TWODEFECTS".to_string(),
        top_defects: vec![
            DefectSignal {
                defect_type: DefectType::MechanicalFailure,
                frequency: 12,
                severity_score: 0.8,
                example_quotes: vec!["it snapped after a week".to_string()],
                total_reviews_scanned: 50,
                negative_reviews_scanned: 20,
            },
            DefectSignal {
                defect_type: DefectType::PoorGrip,
                frequency: 6,
                severity_score: 0.5,
                example_quotes: vec!["slips out of my hand".to_string()],
                total_reviews_scanned: 50,
                negative_reviews_scanned: 20,
            },
        ],
        top_feature_requests: vec![FeatureRequest {
            feature: "waterproof".to_string(),
            mentions: 4,
            confidence: 0.9,
            source_quotes: vec!["wish it was waterproof".to_string()],
            helpful_votes: 10,
            wish_strength: 5.4,
        }],
        dominant_pain: Some(DefectType::MechanicalFailure),
        improvement_score: 0.7,
        reviews_analyzed: 50,
        negative_reviews_analyzed: 20,
        reviews_ready: true,
    }
}

#[test]
fn bundle_is_byte_identical_across_runs() {
    let profile = two_defects_one_wish_profile();

    let first = generate_spec_bundle("B0TWODEFECTS", Some("run-1".to_string()), &profile);
    let second = generate_spec_bundle("B0TWODEFECTS", Some("run-1".to_string()), &profile);

    assert_eq!(first.inputs_hash, second.inputs_hash);
    assert_eq!(first.inputs_hash.len(), 16);
    assert!(first.inputs_hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    assert_eq!(first.oem_spec_text, second.oem_spec_text);
    assert_eq!(first.qc_checklist_text, second.qc_checklist_text);
    assert_eq!(first.supplier_outreach_body, second.supplier_outreach_body);

    assert_eq!(first.bloc_a.len(), 2);
    assert!(first.bloc_a[0].ordering_score >= first.bloc_a[1].ordering_score);

    let mut seen = std::collections::HashSet::new();
    for item in &first.qc_checklist {
        assert!(seen.insert(item.test_name.clone()), "duplicate QC test name: {}", item.test_name);
    }
}
