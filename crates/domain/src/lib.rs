//! Data model and store contracts shared by every other Smartacus crate.

pub mod budget;
pub mod economic_event;
pub mod error;
pub mod events;
pub mod listing;
pub mod metrics;
pub mod niche;
pub mod opportunity;
pub mod review;
pub mod scoring;
pub mod snapshot;
pub mod spec_bundle;
pub mod store;

pub use budget::TokenBudget;
pub use economic_event::{Confidence, EconomicEvent, EconomicEventType, Urgency};
pub use error::{DomainError, Result};
pub use events::{BsrEvent, BsrDirection, DetectedEvents, PriceDirection, PriceEvent, Severity, StockEvent, StockEventKind};
pub use listing::{Listing, UpsertListing};
pub use metrics::AggregatedMetrics;
pub use niche::{Niche, NichePerformanceRecord};
pub use opportunity::{EconomicOpportunity, WindowClass};
pub use review::{DefectSignal, DefectType, FeatureRequest, ImprovementProfile, RawReview};
pub use scoring::{ComponentScore, ScoringResult, ScoringStatus};
pub use snapshot::{FulfillmentType, HistoryPoint, RatingHistogram, Snapshot, StockStatus};
pub use spec_bundle::{OemPriority, OemRequirement, QcPriority, QcTestItem, SpecBloc, SpecBundle};
