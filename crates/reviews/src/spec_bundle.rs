//! Spec bundle generator (§4.11, C11): a closed defect/feature -> OEM+QC
//! mapping table rendered deterministically into an OEM spec, QC checklist
//! and supplier-outreach message.

use chrono::Utc;
use smartacus_domain::{
    ImprovementProfile, OemPriority, OemRequirement, QcPriority, QcTestItem, SpecBloc, SpecBundle,
};

pub const MAPPING_VERSION: &str = "spec-mapping-v1";

struct MappingEntry {
    requirement: &'static str,
    material_spec: Option<&'static str>,
    tolerance: Option<&'static str>,
    qc_category: &'static str,
    qc_test_name: &'static str,
    qc_method: &'static str,
    qc_pass_criterion: &'static str,
}

fn defect_mapping(defect_type: smartacus_domain::DefectType) -> MappingEntry {
    use smartacus_domain::DefectType::*;
    match defect_type {
        MechanicalFailure => MappingEntry {
            requirement: "Mechanism must survive 10,000 actuation cycles without failure",
            material_spec: Some("reinforced polymer or metal internals"),
            tolerance: Some("<=0.5% failure rate at 10k cycles"),
            qc_category: "mechanical",
            qc_test_name: "cycle_endurance",
            qc_method: "run automated actuation rig for 10,000 cycles",
            qc_pass_criterion: "no mechanical failure, no function loss",
        },
        PoorGrip => MappingEntry {
            requirement: "Gripping surface must maintain traction under wet and dry conditions",
            material_spec: Some("textured TPR overmold, Shore A 60-70"),
            tolerance: Some(">=25N static friction, wet and dry"),
            qc_category: "ergonomics",
            qc_test_name: "wet_grip_friction",
            qc_method: "pull-force gauge on wetted sample surface",
            qc_pass_criterion: "static friction >= 25N",
        },
        InstallationIssue => MappingEntry {
            requirement: "Installation must be completable in under 5 minutes with included tools only",
            material_spec: None,
            tolerance: Some("<=5 minute median install time"),
            qc_category: "usability",
            qc_test_name: "install_time_trial",
            qc_method: "time 5 first-time users completing install from printed instructions",
            qc_pass_criterion: "median time <= 5 minutes, zero tool substitutions",
        },
        CompatibilityIssue => MappingEntry {
            requirement: "Dimensions must conform to the published compatibility matrix",
            material_spec: None,
            tolerance: Some("+/-1mm on all mating dimensions"),
            qc_category: "dimensional",
            qc_test_name: "fit_check_matrix",
            qc_method: "fit-check against reference units for each listed compatible model",
            qc_pass_criterion: "successful fit on 100% of matrix entries",
        },
        MaterialQuality => MappingEntry {
            requirement: "Housing material must meet minimum impact and rigidity thresholds",
            material_spec: Some("ABS or PC blend, minimum 2mm wall thickness"),
            tolerance: Some(">=2mm wall thickness, no visible flex under 5kg load"),
            qc_category: "materials",
            qc_test_name: "impact_rigidity",
            qc_method: "drop test from 1m onto concrete, 3 orientations",
            qc_pass_criterion: "no cracking, no functional impairment",
        },
        VibrationNoise => MappingEntry {
            requirement: "Operating noise and vibration must remain within the target band",
            material_spec: Some("vibration-dampening mounts at all contact points"),
            tolerance: Some("<=55dB at 1m, <=2.5 m/s^2 RMS vibration"),
            qc_category: "acoustic",
            qc_test_name: "noise_vibration_profile",
            qc_method: "sound meter and accelerometer during standard operating cycle",
            qc_pass_criterion: "noise <= 55dB, vibration <= 2.5 m/s^2 RMS",
        },
        HeatIssue => MappingEntry {
            requirement: "Surface temperature must stay within safe contact limits during continuous use",
            material_spec: Some("thermal cutoff rated for continuous duty cycle"),
            tolerance: Some("<=60C surface temp after 30min continuous use"),
            qc_category: "thermal",
            qc_test_name: "continuous_duty_thermal",
            qc_method: "thermocouple on contact surfaces during 30 minute continuous run",
            qc_pass_criterion: "surface temp <= 60C, no thermal shutdown triggered",
        },
        SizeFit => MappingEntry {
            requirement: "Sizing must be validated against the published size chart with a published fit panel",
            material_spec: None,
            tolerance: Some("<=5% size-chart mismatch rate from fit panel"),
            qc_category: "dimensional",
            qc_test_name: "size_chart_validation",
            qc_method: "fit panel of 10 across declared size range",
            qc_pass_criterion: "mismatch rate <= 5%",
        },
        Durability => MappingEntry {
            requirement: "Unit must survive the accelerated life-cycle test without functional degradation",
            material_spec: Some("UV-stabilized, fatigue-rated components at wear points"),
            tolerance: Some(">=12 months equivalent accelerated wear"),
            qc_category: "durability",
            qc_test_name: "accelerated_life_cycle",
            qc_method: "accelerated wear rig simulating 12 months of typical use",
            qc_pass_criterion: "no functional degradation at end of cycle",
        },
        Other => MappingEntry {
            requirement: "General quality review required; no specific mapped defect",
            material_spec: None,
            tolerance: None,
            qc_category: "general",
            qc_test_name: "general_inspection",
            qc_method: "visual and functional inspection against sample unit",
            qc_pass_criterion: "no visible or functional defects",
        },
    }
}

fn feature_mapping(feature_key: &str) -> Option<MappingEntry> {
    let keywords: &[(&str, MappingEntry)] = &[
        ("waterproof", MappingEntry {
            requirement: "Add IPX4-rated water resistance",
            material_spec: Some("sealed gaskets at all seams"),
            tolerance: Some("IPX4 minimum"),
            qc_category: "ingress_protection",
            qc_test_name: "ipx4_spray_test",
            qc_method: "spray water from all directions per IEC 60529",
            qc_pass_criterion: "no water ingress affecting function",
        }),
        ("case", MappingEntry {
            requirement: "Include a carrying case or pouch in the base package",
            material_spec: Some("nylon or EVA shell"),
            tolerance: None,
            qc_category: "packaging",
            qc_test_name: "case_inclusion_check",
            qc_method: "verify case presence and fit in outbound sample audit",
            qc_pass_criterion: "case present and unit fits securely",
        }),
        ("charger", MappingEntry {
            requirement: "Include a compatible charger in the base package",
            material_spec: None,
            tolerance: None,
            qc_category: "packaging",
            qc_test_name: "charger_inclusion_check",
            qc_method: "verify charger presence and charge function in outbound sample audit",
            qc_pass_criterion: "charger present and charges unit to 100% within spec time",
        }),
    ];
    keywords.iter().find(|(kw, _)| feature_key.contains(kw)).map(|(_, entry)| MappingEntry {
        requirement: entry.requirement,
        material_spec: entry.material_spec,
        tolerance: entry.tolerance,
        qc_category: entry.qc_category,
        qc_test_name: entry.qc_test_name,
        qc_method: entry.qc_method,
        qc_pass_criterion: entry.qc_pass_criterion,
    })
}

fn qc_item_from(mapping: &MappingEntry, priority: QcPriority, source_defect: Option<String>) -> QcTestItem {
    QcTestItem {
        category: mapping.qc_category.to_string(),
        test_name: mapping.qc_test_name.to_string(),
        method: mapping.qc_method.to_string(),
        pass_criterion: mapping.qc_pass_criterion.to_string(),
        priority,
        source_defect,
    }
}

/// Builds the full bundle (structured rows + rendered text) from one
/// listing's improvement profile (§4.11).
pub fn generate(listing_id: &str, run_id: Option<String>, profile: &ImprovementProfile) -> SpecBundle {
    let mut bloc_a: Vec<OemRequirement> = profile
        .top_defects
        .iter()
        .map(|d| {
            let mapping = defect_mapping(d.defect_type);
            OemRequirement {
                bloc: SpecBloc::A,
                source: d.defect_type.as_str().to_string(),
                requirement: mapping.requirement.to_string(),
                material_spec: mapping.material_spec.map(|s| s.to_string()),
                tolerance: mapping.tolerance.map(|s| s.to_string()),
                priority: OemPriority::from_score(d.severity_score),
                ordering_score: d.severity_score + (d.frequency as f64) * 1e-6,
            }
        })
        .collect();
    bloc_a.sort_by(|a, b| b.ordering_score.partial_cmp(&a.ordering_score).unwrap_or(std::cmp::Ordering::Equal));

    let mut bloc_b: Vec<OemRequirement> = profile
        .top_feature_requests
        .iter()
        .filter_map(|f| {
            let mapping = feature_mapping(&f.feature)?;
            let normalized = (f.wish_strength / 10.0).min(1.0);
            Some(OemRequirement {
                bloc: SpecBloc::B,
                source: f.feature.clone(),
                requirement: mapping.requirement.to_string(),
                material_spec: mapping.material_spec.map(|s| s.to_string()),
                tolerance: mapping.tolerance.map(|s| s.to_string()),
                priority: OemPriority::from_score(normalized),
                ordering_score: normalized,
            })
        })
        .collect();
    bloc_b.sort_by(|a, b| b.ordering_score.partial_cmp(&a.ordering_score).unwrap_or(std::cmp::Ordering::Equal));

    let mut qc_checklist: Vec<QcTestItem> = Vec::new();
    let mut seen_test_names = std::collections::HashSet::new();
    for d in &profile.top_defects {
        let mapping = defect_mapping(d.defect_type);
        let priority = if d.severity_score >= 0.5 { QcPriority::Mandatory } else { QcPriority::Recommended };
        if seen_test_names.insert(mapping.qc_test_name) {
            qc_checklist.push(qc_item_from(&mapping, priority, Some(d.defect_type.as_str().to_string())));
        }
    }
    for f in &profile.top_feature_requests {
        if let Some(mapping) = feature_mapping(&f.feature) {
            if seen_test_names.insert(mapping.qc_test_name) {
                qc_checklist.push(qc_item_from(&mapping, QcPriority::Recommended, None));
            }
        }
    }

    let oem_spec_text = render_oem_spec(listing_id, &bloc_a, &bloc_b);
    let qc_checklist_text = render_qc_checklist(listing_id, &qc_checklist);
    let (supplier_outreach_subject, supplier_outreach_body) = render_supplier_outreach(listing_id, &bloc_a, &bloc_b);

    SpecBundle {
        listing_id: listing_id.to_string(),
        run_id,
        generated_at: Utc::now(),
        bloc_a,
        bloc_b,
        qc_checklist,
        oem_spec_text,
        qc_checklist_text,
        supplier_outreach_subject,
        supplier_outreach_body,
        mapping_version: MAPPING_VERSION.to_string(),
        inputs_hash: smartacus_domain::spec_bundle::compute_inputs_hash(profile),
    }
}

fn render_oem_spec(listing_id: &str, bloc_a: &[OemRequirement], bloc_b: &[OemRequirement]) -> String {
    let mut out = format!("OEM SPECIFICATION — {listing_id}\n\nBLOC A: DEFECT CORRECTIONS\n");
    for (i, r) in bloc_a.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{:?}] {} (source: {})\n   material: {}\n   tolerance: {}\n",
            i + 1,
            r.priority,
            r.requirement,
            r.source,
            r.material_spec.as_deref().unwrap_or("n/a"),
            r.tolerance.as_deref().unwrap_or("n/a"),
        ));
    }
    out.push_str("\nBLOC B: FEATURE ADDITIONS\n");
    for (i, r) in bloc_b.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{:?}] {} (source: {})\n   material: {}\n   tolerance: {}\n",
            i + 1,
            r.priority,
            r.requirement,
            r.source,
            r.material_spec.as_deref().unwrap_or("n/a"),
            r.tolerance.as_deref().unwrap_or("n/a"),
        ));
    }
    out
}

fn render_qc_checklist(listing_id: &str, checklist: &[QcTestItem]) -> String {
    let mut out = format!("QC CHECKLIST — {listing_id}\n\n");
    for (i, item) in checklist.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{:?}] {} / {}\n   method: {}\n   pass: {}\n",
            i + 1,
            item.priority,
            item.category,
            item.test_name,
            item.method,
            item.pass_criterion,
        ));
    }
    out
}

fn render_supplier_outreach(listing_id: &str, bloc_a: &[OemRequirement], bloc_b: &[OemRequirement]) -> (String, String) {
    let subject = format!("Product improvement spec request — {listing_id}");
    let mut body = format!(
        "Hello,\n\nWe would like to request a quote for a revised production run of {listing_id} incorporating the following changes:\n\n"
    );
    for r in bloc_a.iter().chain(bloc_b.iter()) {
        body.push_str(&format!("- {}\n", r.requirement));
    }
    body.push_str("\nPlease confirm feasibility, MOQ, and unit cost for the revised spec.\n\nThank you.\n");
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartacus_domain::{DefectSignal, DefectType, FeatureRequest};

    fn profile() -> ImprovementProfile {
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
                feature: "waterproof case".to_string(),
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
    fn test_bundle_is_reproducible() {
        let p = profile();
        let a = generate("L1", None, &p);
        let b = generate("L1", None, &p);
        assert_eq!(a.inputs_hash, b.inputs_hash);
        assert_eq!(a.oem_spec_text, b.oem_spec_text);
        assert_eq!(a.qc_checklist_text, b.qc_checklist_text);
    }

    #[test]
    fn test_qc_checklist_deduped_by_test_name() {
        let p = profile();
        let bundle = generate("L1", None, &p);
        let mut names = bundle.qc_checklist.iter().map(|q| q.test_name.clone()).collect::<Vec<_>>();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_bloc_a_sorted_by_ordering_score_desc() {
        let p = profile();
        let bundle = generate("L1", None, &p);
        assert!(bundle.bloc_a.windows(2).all(|w| w[0].ordering_score >= w[1].ordering_score));
    }
}
