//! EconomicOpportunity (§3, §4.7): the economic scorer's output — base
//! score multiplied by a time-pressure-derived multiplier, with a
//! risk-adjusted monetary value and a rank-score used by the shortlist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "window_class", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WindowClass {
    Extended,
    Standard,
    Active,
    Urgent,
    Critical,
}

impl WindowClass {
    /// Derived from the composite time-multiplier (§4.7): critical >=1.8 /
    /// urgent >=1.4 / active >=1.1 / standard >=0.9 / extended else.
    pub fn from_multiplier(multiplier: f64) -> WindowClass {
        if multiplier >= 1.8 {
            WindowClass::Critical
        } else if multiplier >= 1.4 {
            WindowClass::Urgent
        } else if multiplier >= 1.1 {
            WindowClass::Active
        } else if multiplier >= 0.9 {
            WindowClass::Standard
        } else {
            WindowClass::Extended
        }
    }

    pub fn urgency(self) -> crate::economic_event::Urgency {
        use crate::economic_event::Urgency;
        match self {
            WindowClass::Critical => Urgency::Critical,
            WindowClass::Urgent => Urgency::High,
            WindowClass::Active => Urgency::Medium,
            WindowClass::Standard | WindowClass::Extended => Urgency::Low,
        }
    }

    /// Recommendation banding is driven by estimated window *days*, not the
    /// window class directly (§4.8); this maps a day count to the label.
    pub fn recommendation_for_days(days: i32) -> &'static str {
        if days <= 14 {
            "immediate action"
        } else if days <= 30 {
            "priority, within 7 days"
        } else if days <= 60 {
            "active, within 2 weeks"
        } else {
            "monitor"
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicOpportunity {
    pub listing_id: String,
    pub detected_at: DateTime<Utc>,
    pub base_score: f64,
    pub time_multiplier: f64,
    pub final_score: f64,
    pub estimated_monthly_profit: rust_decimal::Decimal,
    pub estimated_annual_value: rust_decimal::Decimal,
    pub risk_adjusted_value: rust_decimal::Decimal,
    pub window_class: WindowClass,
    pub window_days: i32,
    pub thesis: String,
    pub rank_score: f64,
}

impl EconomicOpportunity {
    pub fn passes_shortlist_filters(&self, min_score: f64, min_value: rust_decimal::Decimal) -> bool {
        self.final_score >= min_score && self.risk_adjusted_value >= min_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_class_bands() {
        assert_eq!(WindowClass::from_multiplier(1.9), WindowClass::Critical);
        assert_eq!(WindowClass::from_multiplier(1.4), WindowClass::Urgent);
        assert_eq!(WindowClass::from_multiplier(1.1), WindowClass::Active);
        assert_eq!(WindowClass::from_multiplier(0.9), WindowClass::Standard);
        assert_eq!(WindowClass::from_multiplier(0.6), WindowClass::Extended);
    }

    #[test]
    fn test_recommendation_banding() {
        assert_eq!(WindowClass::recommendation_for_days(14), "immediate action");
        assert_eq!(WindowClass::recommendation_for_days(30), "priority, within 7 days");
        assert_eq!(WindowClass::recommendation_for_days(60), "active, within 2 weeks");
        assert_eq!(WindowClass::recommendation_for_days(61), "monitor");
    }
}
