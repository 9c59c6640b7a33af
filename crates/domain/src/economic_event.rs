//! EconomicEvent (§3, §4.5): a higher-level market thesis synthesized from
//! raw events and aggregated metrics, keyed by `(listing_id, detected_at)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "economic_event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EconomicEventType {
    SupplyShock,
    DemandSurge,
    CompetitorCollapse,
    MarketFatigue,
    PriceElasticity,
    MarginCompression,
    QualityDecay,
    SeasonalWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "confidence_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Weak,
    Moderate,
    Strong,
    Confirmed,
}

impl Confidence {
    /// Confidence tier from supporting-signal count with zero
    /// contradictions escalating 3 -> strong (§4.5 SupplyShock example,
    /// generalized to every builder).
    pub fn from_signal_count(supporting: usize, contradicting: usize) -> Confidence {
        match supporting {
            0 | 1 => Confidence::Weak,
            2 => Confidence::Weak,
            3 => {
                if contradicting == 0 {
                    Confidence::Moderate
                } else {
                    Confidence::Weak
                }
            }
            n if n >= 4 => {
                if contradicting == 0 {
                    Confidence::Strong
                } else {
                    Confidence::Moderate
                }
            }
            _ => Confidence::Weak,
        }
    }

    pub fn is_actionable(self) -> bool {
        matches!(self, Confidence::Moderate | Confidence::Strong | Confidence::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "urgency_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Weight table used by C7's rank-score (§4.7).
    pub fn rank_weight(self) -> f64 {
        match self {
            Urgency::Critical => 2.0,
            Urgency::High => 1.5,
            Urgency::Medium => 1.2,
            Urgency::Low => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EconomicEvent {
    pub listing_id: String,
    pub detected_at: DateTime<Utc>,
    pub event_type: EconomicEventType,
    pub thesis: String,
    pub confidence: Confidence,
    pub urgency: Urgency,
    pub estimated_window_days: i32,
    pub supporting_signals: serde_json::Value,
    pub contradicting_signals: serde_json::Value,
    pub opportunity_value: Option<rust_decimal::Decimal>,
}

impl EconomicEvent {
    pub fn supporting_count(&self) -> usize {
        self.supporting_signals.as_array().map(|a| a.len()).unwrap_or(0)
    }

    pub fn contradicting_count(&self) -> usize {
        self.contradicting_signals.as_array().map(|a| a.len()).unwrap_or(0)
    }

    /// Actionable iff confidence is at least moderate AND supporting >= 2
    /// AND signal-ratio >= 0.6 (§4.5).
    pub fn is_actionable(&self) -> bool {
        let supporting = self.supporting_count();
        let contradicting = self.contradicting_count();
        let total = supporting + contradicting;
        if supporting < 2 || total == 0 {
            return false;
        }
        let ratio = supporting as f64 / total as f64;
        self.confidence.is_actionable() && ratio >= 0.6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_signal_count() {
        assert_eq!(Confidence::from_signal_count(2, 0), Confidence::Weak);
        assert_eq!(Confidence::from_signal_count(3, 0), Confidence::Moderate);
        assert_eq!(Confidence::from_signal_count(4, 0), Confidence::Strong);
        assert_eq!(Confidence::from_signal_count(4, 1), Confidence::Moderate);
    }

    fn event(confidence: Confidence, supporting: usize, contradicting: usize) -> EconomicEvent {
        EconomicEvent {
            listing_id: "L1".to_string(),
            detected_at: Utc::now(),
            event_type: EconomicEventType::SupplyShock,
            thesis: "t".to_string(),
            confidence,
            urgency: Urgency::Medium,
            estimated_window_days: 30,
            supporting_signals: serde_json::json!(vec!["s"; supporting]),
            contradicting_signals: serde_json::json!(vec!["c"; contradicting]),
            opportunity_value: None,
        }
    }

    #[test]
    fn test_is_actionable() {
        assert!(event(Confidence::Moderate, 3, 0).is_actionable());
        assert!(!event(Confidence::Weak, 3, 0).is_actionable());
        assert!(!event(Confidence::Strong, 1, 0).is_actionable());
        // ratio 2/4 = 0.5 < 0.6
        assert!(!event(Confidence::Strong, 2, 2).is_actionable());
    }
}
