//! ScoringResult (§3, §4.6): the deterministic scorer's output. `total`
//! must equal the sum of the five component scores, and `time_pressure < 3`
//! must force `is_valid = false` and `status = InvalidNoWindow` — this is a
//! hard gate enforced at construction time, not merely documented (§8).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scoring_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ScoringStatus {
    Exceptional,
    Strong,
    Moderate,
    Weak,
    Rejected,
    InvalidNoWindow,
}

/// One of the five additive scoring components (margin, velocity,
/// competition, gap, time-pressure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentScore {
    pub name: String,
    pub score: i32,
    pub max: i32,
    pub sub_scores: serde_json::Value,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub listing_id: String,
    pub total: i32,
    pub status: ScoringStatus,
    pub is_valid: bool,
    pub window_label: String,
    pub window_days: i32,
    pub components: Vec<ComponentScore>,
    pub rejection_reason: Option<String>,
}

impl ScoringResult {
    /// Component name for the time-pressure score, used by callers that
    /// need to pull it back out of `components` without a magic string
    /// scattered across the codebase.
    pub const TIME_PRESSURE: &'static str = "time_pressure";

    pub fn component(&self, name: &str) -> Option<&ComponentScore> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn time_pressure_score(&self) -> i32 {
        self.component(Self::TIME_PRESSURE).map(|c| c.score).unwrap_or(0)
    }

    /// Invariant check used in tests and as a runtime assertion inside the
    /// scorer itself: total must equal the sum of component scores (§8).
    pub fn sum_matches_total(&self) -> bool {
        self.components.iter().map(|c| c.score).sum::<i32>() == self.total
    }
}
