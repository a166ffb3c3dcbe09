//! Date-analysis pipeline
//!
//! caller → [`DayAnalyzer`] → [`RequestCoordinator`] → [`WaterfallOrchestrator`]
//! → [`TierSearchAdapter`] → [`RateLimitedClient`] → search provider
//!
//! The winning item then passes the [`SummaryGate`] and the result is written to the record store.

pub mod analyzer;
pub mod coordinator;
pub mod dispatch;
pub mod fallback;
pub mod orchestrator;
pub mod summary;
pub mod tier_search;
pub mod types;

pub use analyzer::DayAnalyzer;
pub use coordinator::{CoordinatorStats, RequestCoordinator};
pub use dispatch::{DispatchStats, RateLimitedClient};
pub use orchestrator::{advance, WaterfallOrchestrator, WaterfallState};
pub use summary::SummaryGate;
pub use tier_search::TierSearchAdapter;
pub use types::{
    DayAnalysis, HistoricalRecord, RequestKey, SearchStep, SummarySource, Tier, TierItem,
    TierVerdict, ValidationVerdict, WaterfallOutcome, WinningTier,
};
