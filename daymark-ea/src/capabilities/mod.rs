//! Injected external capabilities
//!
//! The pipeline only consumes these traits. Concrete HTTP adapters live in the submodules and
//! tests substitute scripted fakes.

pub mod exa_client;
pub mod historical;
pub mod openai_client;
pub mod record_store;

use crate::error::CapabilityError;
use crate::waterfall::types::{
    DayAnalysis, HistoricalRecord, Tier, TierItem, ValidationVerdict,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub use exa_client::ExaSearchClient;
pub use historical::StaticHistoricalKnowledge;
pub use openai_client::OpenAiClient;
pub use record_store::InMemoryRecordStore;

/// One date-bounded search query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub text: String,
    /// `YYYY-MM-DDT00:00:00.000Z` of the target day
    pub window_start: String,
    /// `YYYY-MM-DDT23:59:59.999Z` of the target day
    pub window_end: String,
    /// Normalized timestamps whose hits must be dropped
    pub exclude_timestamps: Vec<String>,
    pub include_domains: Vec<String>,
    pub max_results: u32,
    /// Instruction for provider-side per-hit summaries
    pub summary_query: Option<String>,
}

/// Raw provider hit, before normalization into a [`TierItem`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchHit {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_date: Option<String>,
    pub author: Option<String>,
    pub text: Option<String>,
    pub summary: Option<String>,
    pub score: Option<f64>,
}

/// External news search
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query
    ///
    /// Errors are absorbed by the dispatcher and become zero hits.
    async fn query(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError>;
}

/// Judges whether a tier's items justify stopping escalation
#[async_trait::async_trait]
pub trait SignificanceValidator: Send + Sync {
    /// Validate a non-empty item set for one tier
    ///
    /// # Arguments
    /// * `items` - Items returned for `tier`, never empty
    /// * `tier` - Tier being judged
    /// * `date` - Target calendar date
    ///
    /// # Returns
    /// Verdict; an `Err` is treated as significant by the orchestrator
    async fn validate(
        &self,
        items: &[TierItem],
        tier: Tier,
        date: NaiveDate,
    ) -> Result<ValidationVerdict, CapabilityError>;
}

/// Produces the fixed-length description of the winning item
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, item: &TierItem, date: NaiveDate) -> Result<String, CapabilityError>;
}

/// Static exact-date knowledge consulted when every tier is exhausted
#[async_trait::async_trait]
pub trait HistoricalKnowledgeBase: Send + Sync {
    async fn lookup(&self, date: NaiveDate) -> Result<Option<HistoricalRecord>, CapabilityError>;
}

/// Keyed persistence for finished analyses
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(
        &self,
        date: NaiveDate,
        provider: &str,
    ) -> Result<Option<DayAnalysis>, CapabilityError>;

    async fn put(&self, analysis: &DayAnalysis) -> Result<(), CapabilityError>;
}

/// Language-model capabilities bound to one provider id
#[derive(Clone)]
pub struct ProviderSet {
    pub validator: Arc<dyn SignificanceValidator>,
    pub summarizer: Arc<dyn Summarizer>,
}

/// Provider id → capabilities
pub type ProviderRegistry = HashMap<String, ProviderSet>;
