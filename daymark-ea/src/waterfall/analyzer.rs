//! Date analysis entry point
//!
//! `analyze(date, force_override, provider)`:
//! 1. Reject unknown providers
//! 2. Unless forced, answer from the record store when it holds the date
//! 3. Admit through the coordinator; the leading caller runs waterfall, summary gate and store put
//!
//! Record-store failures are logged and otherwise ignored.

use super::coordinator::{CoordinatorStats, RequestCoordinator};
use super::dispatch::{DispatchStats, RateLimitedClient};
use super::orchestrator::WaterfallOrchestrator;
use super::summary::SummaryGate;
use super::tier_search::TierSearchAdapter;
use super::types::{DayAnalysis, RequestKey};
use crate::capabilities::{
    HistoricalKnowledgeBase, ProviderRegistry, ProviderSet, RecordStore, SearchProvider,
};
use crate::error::AnalysisError;
use chrono::NaiveDate;
use daymark_common::config::TomlConfig;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Collaborators shared by every run
struct RunContext {
    orchestrator: WaterfallOrchestrator,
    summary_gate: SummaryGate,
    store: Arc<dyn RecordStore>,
}

/// Maps a date to its most significant event
pub struct DayAnalyzer {
    context: Arc<RunContext>,
    coordinator: RequestCoordinator<Arc<DayAnalysis>>,
    dispatcher: Arc<RateLimitedClient>,
    providers: ProviderRegistry,
}

impl DayAnalyzer {
    /// Assemble the pipeline from configuration and capabilities
    ///
    /// # Arguments
    /// * `config` - Dispatch, coordinator, summary, search and tier settings
    /// * `search` - External search capability
    /// * `historical` - Exact-date knowledge for exhausted runs
    /// * `store` - Record store consulted before and written after a run
    /// * `providers` - Validator/summarizer pairs by provider id
    pub fn new(
        config: &TomlConfig,
        search: Arc<dyn SearchProvider>,
        historical: Arc<dyn HistoricalKnowledgeBase>,
        store: Arc<dyn RecordStore>,
        providers: ProviderRegistry,
    ) -> Self {
        let dispatcher = Arc::new(RateLimitedClient::new(
            config.dispatch.max_in_flight,
            config.dispatch.min_interval(),
        ));
        let adapter = TierSearchAdapter::new(
            search,
            Arc::clone(&dispatcher),
            config.tiers.clone(),
            &config.search,
        );

        Self {
            context: Arc::new(RunContext {
                orchestrator: WaterfallOrchestrator::new(adapter, historical),
                summary_gate: SummaryGate::new(config.summary.clone()),
                store,
            }),
            coordinator: RequestCoordinator::new(config.coordinator.recent_ttl()),
            dispatcher,
            providers,
        }
    }

    /// Analyze `date` with `provider`'s validator and summarizer
    pub async fn analyze(
        &self,
        date: NaiveDate,
        force_override: bool,
        provider: &str,
    ) -> Result<Arc<DayAnalysis>, AnalysisError> {
        let capabilities = self
            .providers
            .get(provider)
            .cloned()
            .ok_or_else(|| AnalysisError::UnknownProvider(provider.to_string()))?;

        if !force_override {
            match self.context.store.get(date, provider).await {
                Ok(Some(stored)) => {
                    info!(date = %date, provider = %provider, "Answered from record store");
                    return Ok(Arc::new(stored));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(date = %date, provider = %provider, error = %e, "Record store lookup failed");
                }
            }
        }

        let key = RequestKey::new(date, provider);
        let context = Arc::clone(&self.context);
        let provider = provider.to_string();

        self.coordinator
            .admit(key, force_override, move || {
                let request_id = Uuid::new_v4();
                let span = info_span!("analysis", %request_id, %date, provider = %provider);
                run_analysis(context, capabilities, date, provider, request_id).instrument(span)
            })
            .await
    }

    /// Drop coalescing memory for `date` so the next request runs again
    pub fn forget(&self, date: NaiveDate) -> usize {
        let removed = self.coordinator.forget(date);
        info!(date = %date, removed, "Forgot recent outcomes");
        removed
    }

    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn coordinator_stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }
}

async fn run_analysis(
    context: Arc<RunContext>,
    capabilities: ProviderSet,
    date: NaiveDate,
    provider: String,
    request_id: Uuid,
) -> Result<Arc<DayAnalysis>, AnalysisError> {
    info!("Analysis started");

    let outcome = context
        .orchestrator
        .run(date, capabilities.validator.as_ref())
        .await;

    let summary = context
        .summary_gate
        .summarize(capabilities.summarizer.as_ref(), &outcome, date)
        .await?;

    let summary_attempts = summary.attempts;
    let analysis = DayAnalysis {
        request_id,
        date,
        provider,
        outcome,
        summary: summary.text,
        summary_source: summary.source,
        analyzed_at: daymark_common::time::now(),
    };

    if let Err(e) = context.store.put(&analysis).await {
        warn!(error = %e, "Record store write failed");
    }

    info!(
        winning_tier = ?analysis.outcome.winning_tier,
        summary_source = ?analysis.summary_source,
        summary_attempts,
        "Analysis complete"
    );

    Ok(Arc::new(analysis))
}
