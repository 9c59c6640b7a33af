//! Improvement aggregator (§4.10, C10): rolls raw defect/wish signals into
//! one per-listing [`ImprovementProfile`] with a single improvement-score.

use smartacus_domain::{DefectSignal, FeatureRequest, ImprovementProfile, RawReview};

const TOP_N: usize = 5;
const DEFECT_WEIGHTS: [f64; 5] = [3.0, 2.0, 1.5, 1.0, 1.0];

pub fn aggregate(listing_id: &str, reviews: &[RawReview], defects: Vec<DefectSignal>, wishes: Vec<FeatureRequest>) -> ImprovementProfile {
    let negative_reviews_analyzed = reviews.iter().filter(|r| r.is_negative()).count() as i32;
    let reviews_analyzed = reviews.len() as i32;

    if reviews.is_empty() {
        return ImprovementProfile::empty(listing_id);
    }

    let mut top_defects = defects;
    top_defects.sort_by(|a, b| b.severity_score.partial_cmp(&a.severity_score).unwrap_or(std::cmp::Ordering::Equal));
    top_defects.truncate(TOP_N);

    let mut top_wishes = wishes;
    top_wishes.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    top_wishes.truncate(TOP_N);

    let dominant_pain = top_defects.first().map(|d| d.defect_type);

    let weights = &DEFECT_WEIGHTS[..top_defects.len().min(DEFECT_WEIGHTS.len())];
    let weight_total: f64 = weights.iter().sum();
    let weighted_avg_severity = if weight_total > 0.0 {
        top_defects.iter().zip(weights).map(|(d, w)| d.severity_score * w).sum::<f64>() / weight_total
    } else {
        0.0
    };

    let frequency_total: i32 = top_defects.iter().map(|d| d.frequency).sum();
    let coverage = if negative_reviews_analyzed > 0 {
        (frequency_total as f64 / negative_reviews_analyzed as f64).min(1.0)
    } else {
        0.0
    };

    let defect_score = weighted_avg_severity * (0.5 + 0.5 * coverage);
    let strong_wish_count = top_wishes.iter().filter(|w| w.mentions >= 3).count();
    let wish_bonus = (0.1 * strong_wish_count as f64).min(0.2);
    let improvement_score = (defect_score + wish_bonus).min(1.0);
    let improvement_score = (improvement_score * 1000.0).round() / 1000.0;

    ImprovementProfile {
        listing_id: listing_id.to_string(),
        top_defects,
        top_feature_requests: top_wishes,
        dominant_pain,
        improvement_score,
        reviews_analyzed,
        negative_reviews_analyzed,
        reviews_ready: reviews_analyzed >= 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use smartacus_domain::DefectType;

    fn review(rating: i32) -> RawReview {
        RawReview { review_id: uuid::Uuid::new_v4().to_string(), body: "x".to_string(), rating, title: None, date: Utc::now(), helpful_votes: 0 }
    }

    fn defect(severity: f64, frequency: i32) -> DefectSignal {
        DefectSignal { defect_type: DefectType::PoorGrip, frequency, severity_score: severity, example_quotes: vec![], total_reviews_scanned: 20, negative_reviews_scanned: 10 }
    }

    #[test]
    fn test_empty_reviews_produce_unready_profile() {
        let profile = aggregate("L1", &[], vec![], vec![]);
        assert_eq!(profile.improvement_score, 0.0);
        assert!(!profile.reviews_ready);
    }

    #[test]
    fn test_improvement_score_in_unit_interval() {
        let reviews: Vec<RawReview> = (0..10).map(|_| review(2)).collect();
        let profile = aggregate("L1", &reviews, vec![defect(0.8, 5)], vec![]);
        assert!(profile.improvement_score >= 0.0 && profile.improvement_score <= 1.0);
        assert_eq!(profile.dominant_pain, Some(DefectType::PoorGrip));
    }

    #[test]
    fn test_top_defects_capped_at_five() {
        let reviews: Vec<RawReview> = (0..20).map(|_| review(2)).collect();
        let defects: Vec<DefectSignal> = (0..8).map(|i| defect(0.1 * i as f64, 2)).collect();
        let profile = aggregate("L1", &reviews, defects, vec![]);
        assert_eq!(profile.top_defects.len(), 5);
        assert!(profile.top_defects.windows(2).all(|w| w[0].severity_score >= w[1].severity_score));
    }
}
