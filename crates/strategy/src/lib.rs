//! Budget-allocating strategy agent and the single-cycle scheduler that
//! drives it (§4.12-§4.13).

pub mod agent;
pub mod error;
pub mod scheduler;

pub use agent::{decide, decide_with_oracle, Allocation, Decision, DecisionOracle, NicheAssessment, NicheAssessmentInput};
pub use error::{Result, StrategyError};
pub use scheduler::{run_daemon, run_once, CycleOutcome, SchedulerDeps};
