//! Ingestion, event detection, scoring and shortlist generation — the core
//! scan-to-shortlist pipeline (§4.3-§4.8, §4.14).

pub mod economic_events;
pub mod economic_scoring;
pub mod error;
pub mod events;
pub mod ingestion;
pub mod orchestrator;
pub mod scoring;
pub mod shortlist;

pub use economic_events::{synthesize, SignalBundle};
pub use economic_scoring::{economic_score, EconomicScoringInputs, SourcingQuote};
pub use error::{PipelineError, Result};
pub use events::{aggregate_metrics, detect_events};
pub use ingestion::{IngestionPipeline, IngestionRequest, IngestionResult};
pub use orchestrator::{run_cycle, CycleRequest, OrchestratorDeps};
pub use scoring::{score, ScoringInputs};
pub use shortlist::{build_shortlist, ShortlistEntry, ShortlistFilters};
