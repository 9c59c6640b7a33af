//! Review signal extractor (§4.9, C9): lexicon-matched defect counts plus
//! regex wish-pattern extraction. Pure function of review text — identical
//! input always yields identical output.

use once_cell::sync::Lazy;
use regex::Regex;
use smartacus_domain::{DefectSignal, DefectType, FeatureRequest, RawReview};
use std::collections::HashMap;

struct DefectKeyword {
    phrase: &'static str,
    weight: f64,
}

static DEFECT_LEXICON: Lazy<HashMap<DefectType, Vec<DefectKeyword>>> = Lazy::new(|| {
    use DefectType::*;
    let mut m = HashMap::new();
    m.insert(MechanicalFailure, vec![
        DefectKeyword { phrase: "stopped working", weight: 1.0 },
        DefectKeyword { phrase: "broke after", weight: 1.0 },
        DefectKeyword { phrase: "jammed", weight: 0.8 },
        DefectKeyword { phrase: "motor died", weight: 1.0 },
    ]);
    m.insert(PoorGrip, vec![
        DefectKeyword { phrase: "slips", weight: 0.8 },
        DefectKeyword { phrase: "slippery", weight: 0.8 },
        DefectKeyword { phrase: "hard to hold", weight: 0.6 },
        DefectKeyword { phrase: "no grip", weight: 0.9 },
    ]);
    m.insert(InstallationIssue, vec![
        DefectKeyword { phrase: "hard to install", weight: 0.8 },
        DefectKeyword { phrase: "instructions unclear", weight: 0.6 },
        DefectKeyword { phrase: "wouldn't mount", weight: 0.9 },
    ]);
    m.insert(CompatibilityIssue, vec![
        DefectKeyword { phrase: "doesn't fit", weight: 0.9 },
        DefectKeyword { phrase: "not compatible", weight: 1.0 },
        DefectKeyword { phrase: "wrong size for", weight: 0.7 },
    ]);
    m.insert(MaterialQuality, vec![
        DefectKeyword { phrase: "cheap plastic", weight: 0.8 },
        DefectKeyword { phrase: "flimsy", weight: 0.8 },
        DefectKeyword { phrase: "feels cheap", weight: 0.7 },
    ]);
    m.insert(VibrationNoise, vec![
        DefectKeyword { phrase: "too loud", weight: 0.7 },
        DefectKeyword { phrase: "vibrates a lot", weight: 0.9 },
        DefectKeyword { phrase: "rattles", weight: 0.7 },
    ]);
    m.insert(HeatIssue, vec![
        DefectKeyword { phrase: "overheats", weight: 1.0 },
        DefectKeyword { phrase: "gets too hot", weight: 0.9 },
        DefectKeyword { phrase: "burning smell", weight: 1.0 },
    ]);
    m.insert(SizeFit, vec![
        DefectKeyword { phrase: "runs small", weight: 0.7 },
        DefectKeyword { phrase: "runs large", weight: 0.7 },
        DefectKeyword { phrase: "too bulky", weight: 0.6 },
    ]);
    m.insert(Durability, vec![
        DefectKeyword { phrase: "broke within", weight: 1.0 },
        DefectKeyword { phrase: "didn't last", weight: 0.9 },
        DefectKeyword { phrase: "wore out fast", weight: 0.8 },
    ]);
    m.insert(Other, vec![DefectKeyword { phrase: "disappointed", weight: 0.4 }]);
    m
});

static WISH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)i wish (?:it|this|they) ([a-z0-9 ,'-]{3,60})",
        r"(?i)would be better if ([a-z0-9 ,'-]{3,60})",
        r"(?i)would love (?:a|an|it to have |to see )?([a-z0-9 ,'-]{3,60})",
        r"(?i)missing (?:a |an |the )?([a-z0-9 ,'-]{3,60})",
        r"(?i)needs (?:a |an |to have )?([a-z0-9 ,'-]{3,60})",
        r"(?i)should have (?:a |an |had )?([a-z0-9 ,'-]{3,60})",
        r"(?i)lacks (?:a |an |the )?([a-z0-9 ,'-]{3,60})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static wish pattern compiles"))
    .collect()
});

const STOP_WORDS: &[&str] = &["a", "an", "the", "to", "it", "this", "that", "of", "for", "with"];

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn normalize_wish(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .collect();
    words.join(" ")
}

/// Extracts defect signals from the negative subset of `reviews` (rating
/// <= 3). `k` is the log-dampening constant in the severity formula.
pub fn extract_defects(reviews: &[RawReview], k: f64) -> Vec<DefectSignal> {
    let negative: Vec<&RawReview> = reviews.iter().filter(|r| r.is_negative()).collect();
    if negative.is_empty() {
        return Vec::new();
    }

    DefectType::ALL
        .iter()
        .filter_map(|&defect_type| {
            let keywords = DEFECT_LEXICON.get(&defect_type)?;
            let mut matched_reviews = 0usize;
            let mut weight_sum = 0.0;
            let mut quotes = Vec::new();

            for review in &negative {
                let body_lower = review.body.to_lowercase();
                let hits: Vec<&DefectKeyword> = keywords.iter().filter(|kw| body_lower.contains(kw.phrase)).collect();
                if !hits.is_empty() {
                    matched_reviews += 1;
                    weight_sum += hits.iter().map(|kw| kw.weight).sum::<f64>();
                    if quotes.len() < 3 {
                        quotes.push(review.body.clone());
                    }
                }
            }

            if matched_reviews == 0 {
                return None;
            }

            let severity = clamp01(weight_sum / negative.len() as f64) * (1.0 + (matched_reviews as f64).ln_1p() / k);
            Some(DefectSignal {
                defect_type,
                frequency: matched_reviews as i32,
                severity_score: clamp01(severity),
                example_quotes: quotes,
                total_reviews_scanned: reviews.len() as i32,
                negative_reviews_scanned: negative.len() as i32,
            })
        })
        .collect()
}

/// Extracts and aggregates wish-pattern feature requests across all
/// reviews (not just negative ones).
pub fn extract_wishes(reviews: &[RawReview]) -> Vec<FeatureRequest> {
    struct Accumulator {
        mentions: i32,
        helpful_votes: i64,
        quotes: Vec<String>,
        canonical: String,
    }

    let mut buckets: Vec<Accumulator> = Vec::new();

    for review in reviews {
        for pattern in WISH_PATTERNS.iter() {
            for capture in pattern.captures_iter(&review.body) {
                let raw = capture.get(1).map(|m| m.as_str()).unwrap_or_default();
                let key = normalize_wish(raw);
                if key.is_empty() {
                    continue;
                }

                if let Some(existing) = buckets.iter_mut().find(|b| strsim::jaro_winkler(&b.canonical, &key) >= 0.85) {
                    existing.mentions += 1;
                    existing.helpful_votes += review.helpful_votes;
                    if existing.quotes.len() < 3 {
                        existing.quotes.push(review.body.clone());
                    }
                } else {
                    buckets.push(Accumulator {
                        mentions: 1,
                        helpful_votes: review.helpful_votes,
                        quotes: vec![review.body.clone()],
                        canonical: key,
                    });
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|b| {
            let wish_strength = FeatureRequest::compute_wish_strength(b.mentions, b.helpful_votes);
            FeatureRequest {
                feature: b.canonical,
                mentions: b.mentions,
                confidence: clamp01(b.mentions as f64 / 10.0),
                source_quotes: b.quotes,
                helpful_votes: b.helpful_votes,
                wish_strength,
            }
        })
        .collect()
}

pub const SEVERITY_DAMPENING_K: f64 = 3.0;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(rating: i32, body: &str, helpful: i64) -> RawReview {
        RawReview { review_id: uuid::Uuid::new_v4().to_string(), body: body.to_string(), rating, title: None, date: Utc::now(), helpful_votes: helpful }
    }

    #[test]
    fn test_extract_defects_finds_poor_grip() {
        let reviews = vec![
            review(2, "the handle slips when wet, no grip at all", 3),
            review(1, "it slips constantly", 1),
            review(5, "great product no issues", 0),
        ];
        let defects = extract_defects(&reviews, SEVERITY_DAMPENING_K);
        let grip = defects.iter().find(|d| d.defect_type == DefectType::PoorGrip).unwrap();
        assert_eq!(grip.frequency, 2);
        assert!(grip.severity_score > 0.0 && grip.severity_score <= 1.0);
        assert!(grip.example_quotes.len() <= 3);
    }

    #[test]
    fn test_extract_defects_empty_when_no_negatives() {
        let reviews = vec![review(5, "slips a bit but fine", 0)];
        assert!(extract_defects(&reviews, SEVERITY_DAMPENING_K).is_empty());
    }

    #[test]
    fn test_extract_wishes_collapses_synonyms() {
        let reviews = vec![
            review(4, "i wish it had a carrying case", 2),
            review(3, "i wish it had a carrying pouch", 5),
        ];
        let wishes = extract_wishes(&reviews);
        assert_eq!(wishes.len(), 1);
        assert_eq!(wishes[0].mentions, 2);
        assert_eq!(wishes[0].helpful_votes, 7);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let reviews = vec![review(2, "it overheats and the handle slips", 4)];
        let first = extract_defects(&reviews, SEVERITY_DAMPENING_K);
        let second = extract_defects(&reviews, SEVERITY_DAMPENING_K);
        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }
}
