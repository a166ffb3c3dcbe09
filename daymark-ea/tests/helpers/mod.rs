//! Test Helper Utilities
//!
//! Scripted fakes for every injected capability. Tier queries in [`test_config`] are the tier
//! names, so the search fake can tell tiers apart by query text.

#![allow(dead_code)]

use chrono::NaiveDate;
use daymark_common::config::TomlConfig;
use daymark_ea::capabilities::{
    HistoricalKnowledgeBase, ProviderRegistry, ProviderSet, RecordStore, SearchHit,
    SearchProvider, SearchRequest, SignificanceValidator, Summarizer,
};
use daymark_ea::waterfall::{
    DayAnalysis, DayAnalyzer, HistoricalRecord, Tier, TierItem, ValidationVerdict,
};
use daymark_ea::CapabilityError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PROVIDER: &str = "test-llm";

/// A 108-character summary that passes the quality gate
pub const GOOD_SUMMARY: &str =
    "Bitcoin completed its fourth halving at height 840000 and cut the mining subsidy to 3.125 BTC for each block";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Defaults with no dispatch spacing and tier queries named after their tier
pub fn test_config() -> TomlConfig {
    let mut config = TomlConfig::default();
    config.dispatch.min_interval_ms = 0;
    config.tiers.primary.query = "primary".to_string();
    config.tiers.secondary.query = "secondary".to_string();
    config.tiers.tertiary.query = "tertiary".to_string();
    config
}

pub fn tier_of(request: &SearchRequest) -> Tier {
    match request.text.as_str() {
        "primary" => Tier::Primary,
        "secondary" => Tier::Secondary,
        _ => Tier::Tertiary,
    }
}

/// Search hit published at noon on `day`
pub fn hit(id: &str, score: f64, day: &str) -> SearchHit {
    SearchHit {
        id: Some(id.to_string()),
        title: Some(format!("Headline {}", id)),
        url: Some(format!("https://news.example/{}", id)),
        published_date: Some(format!("{}T12:00:00.000Z", day)),
        author: None,
        text: Some(format!("Body of {}", id)),
        summary: None,
        score: Some(score),
    }
}

// ============================================================================
// Search
// ============================================================================

/// Per-tier canned hits with call counting
#[derive(Default)]
pub struct ScriptedSearch {
    hits: HashMap<Tier, Vec<SearchHit>>,
    failing: Vec<Tier>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Tier>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, tier: Tier, hits: Vec<SearchHit>) -> Self {
        self.hits.insert(tier, hits);
        self
    }

    pub fn failing(mut self, tier: Tier) -> Self {
        self.failing.push(tier);
        self
    }

    /// Hold every query for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Tier> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchProvider for ScriptedSearch {
    async fn query(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError> {
        let tier = tier_of(request);
        self.calls.lock().unwrap().push(tier);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&tier) {
            return Err(CapabilityError::Status(500, "scripted failure".to_string()));
        }
        Ok(self.hits.get(&tier).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Per-tier verdicts; unscripted tiers are not significant
#[derive(Default)]
pub struct ScriptedValidator {
    verdicts: HashMap<Tier, ValidationVerdict>,
    failing: Vec<Tier>,
    calls: Mutex<Vec<Tier>>,
}

impl ScriptedValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn significant(mut self, tier: Tier, selected: Option<&str>) -> Self {
        self.verdicts.insert(
            tier,
            ValidationVerdict::significant("scripted", selected.map(str::to_string)),
        );
        self
    }

    pub fn failing(mut self, tier: Tier) -> Self {
        self.failing.push(tier);
        self
    }

    pub fn calls(&self) -> Vec<Tier> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SignificanceValidator for ScriptedValidator {
    async fn validate(
        &self,
        _items: &[TierItem],
        tier: Tier,
        _date: NaiveDate,
    ) -> Result<ValidationVerdict, CapabilityError> {
        self.calls.lock().unwrap().push(tier);
        if self.failing.contains(&tier) {
            return Err(CapabilityError::Network("scripted timeout".to_string()));
        }
        Ok(self
            .verdicts
            .get(&tier)
            .cloned()
            .unwrap_or_else(|| ValidationVerdict::not_significant("scripted")))
    }
}

// ============================================================================
// Summarizer
// ============================================================================

/// Replays queued replies, then answers with [`GOOD_SUMMARY`]
#[derive(Default)]
pub struct ScriptedSummarizer {
    replies: Mutex<VecDeque<Result<String, CapabilityError>>>,
    calls: AtomicUsize,
}

impl ScriptedSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(replies: Vec<Result<String, CapabilityError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails
    pub fn unavailable(times: usize) -> Self {
        Self::replying(
            (0..times)
                .map(|_| Err(CapabilityError::Unavailable("scripted".to_string())))
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, _item: &TierItem, _date: NaiveDate) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GOOD_SUMMARY.to_string()))
    }
}

// ============================================================================
// Historical knowledge and storage
// ============================================================================

/// Returns one fixed answer for every date
pub struct FixedHistorical(pub Result<Option<HistoricalRecord>, String>);

impl FixedHistorical {
    pub fn none() -> Self {
        Self(Ok(None))
    }

    pub fn record(day: &str, title: &str) -> Self {
        Self(Ok(Some(HistoricalRecord {
            date: date(day),
            title: title.to_string(),
            description: format!("{} happened", title),
            sources: vec!["https://history.example".to_string()],
        })))
    }

    pub fn failing() -> Self {
        Self(Err("scripted lookup failure".to_string()))
    }
}

#[async_trait::async_trait]
impl HistoricalKnowledgeBase for FixedHistorical {
    async fn lookup(&self, _date: NaiveDate) -> Result<Option<HistoricalRecord>, CapabilityError> {
        self.0.clone().map_err(CapabilityError::Network)
    }
}

/// Store whose every call fails
pub struct FailingStore;

#[async_trait::async_trait]
impl RecordStore for FailingStore {
    async fn get(
        &self,
        _date: NaiveDate,
        _provider: &str,
    ) -> Result<Option<DayAnalysis>, CapabilityError> {
        Err(CapabilityError::Network("store offline".to_string()))
    }

    async fn put(&self, _analysis: &DayAnalysis) -> Result<(), CapabilityError> {
        Err(CapabilityError::Network("store offline".to_string()))
    }
}

// ============================================================================
// Assembly
// ============================================================================

pub fn providers(
    validator: Arc<ScriptedValidator>,
    summarizer: Arc<ScriptedSummarizer>,
) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.insert(
        PROVIDER.to_string(),
        ProviderSet {
            validator,
            summarizer,
        },
    );
    registry
}

pub fn analyzer(
    config: &TomlConfig,
    search: Arc<ScriptedSearch>,
    validator: Arc<ScriptedValidator>,
    summarizer: Arc<ScriptedSummarizer>,
    historical: FixedHistorical,
    store: Arc<dyn RecordStore>,
) -> DayAnalyzer {
    DayAnalyzer::new(
        config,
        search,
        Arc::new(historical),
        store,
        providers(validator, summarizer),
    )
}
