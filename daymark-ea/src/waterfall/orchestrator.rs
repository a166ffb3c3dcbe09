//! Tiered waterfall orchestration
//!
//! Tiers are searched in priority order and the first significant tier wins. Lower tiers are
//! not queried after a win. The loop is an explicit state machine driven by [`advance`], a pure
//! transition over one tier's items and verdict.
//!
//! Verdict policy:
//! - empty tier: not significant, validator not called
//! - final-authority tier with items: significant, validator not called
//! - validator error: significant (fail-open) with synthetic reasoning

use super::fallback::resolve_exhausted;
use super::tier_search::TierSearchAdapter;
use super::types::{
    SearchStep, Tier, TierItem, TierVerdict, ValidationVerdict, WaterfallOutcome,
};
use crate::capabilities::{HistoricalKnowledgeBase, SignificanceValidator};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Waterfall position
#[derive(Debug, Clone, PartialEq)]
pub enum WaterfallState {
    /// Next tier to query
    Querying(Tier),
    /// Significant tier found
    Won { tier: Tier, item: TierItem },
    /// Every tier queried, none significant
    Exhausted,
}

/// Transition after `tier` produced `items` and `verdict`
pub fn advance(tier: Tier, items: &[TierItem], verdict: &ValidationVerdict) -> WaterfallState {
    if verdict.is_significant {
        if let Some(item) = verdict.pick(items) {
            return WaterfallState::Won {
                tier,
                item: item.clone(),
            };
        }
    }

    match tier.next() {
        Some(next) => WaterfallState::Querying(next),
        None => WaterfallState::Exhausted,
    }
}

/// Runs the waterfall for one date
pub struct WaterfallOrchestrator {
    search: TierSearchAdapter,
    historical: Arc<dyn HistoricalKnowledgeBase>,
}

impl WaterfallOrchestrator {
    pub fn new(search: TierSearchAdapter, historical: Arc<dyn HistoricalKnowledgeBase>) -> Self {
        Self { search, historical }
    }

    /// Run every needed tier for `date` and pick a winner
    ///
    /// Always returns an outcome; a run with nothing significant ends in a fallback item.
    pub async fn run(
        &self,
        date: NaiveDate,
        validator: &dyn SignificanceValidator,
    ) -> WaterfallOutcome {
        let mut all_tier_items = BTreeMap::new();
        let mut search_path = Vec::new();
        let mut validation_verdicts = Vec::new();

        let mut state = WaterfallState::Querying(Tier::Primary);
        while let WaterfallState::Querying(tier) = state {
            let items = self.search.search_tier(tier, date).await;
            let verdict = verdict_for(validator, tier, &items, date).await;

            info!(
                date = %date,
                tier = %tier,
                count = items.len(),
                significant = verdict.is_significant,
                "Tier evaluated"
            );

            state = advance(tier, &items, &verdict);

            search_path.push(SearchStep {
                tier,
                count: items.len(),
            });
            validation_verdicts.push(TierVerdict { tier, verdict });
            all_tier_items.insert(tier, items);
        }

        let (winning_tier, selected_item) = match state {
            WaterfallState::Won { tier, item } => (tier.into(), item),
            _ => resolve_exhausted(self.historical.as_ref(), date).await,
        };

        let outcome = WaterfallOutcome {
            winning_tier,
            selected_item,
            all_tier_items,
            search_path,
            validation_verdicts,
        };

        info!(
            date = %date,
            winning_tier = ?outcome.winning_tier,
            tiers_queried = outcome.search_path.len(),
            items_examined = outcome.total_items(),
            "Waterfall complete"
        );

        outcome
    }
}

async fn verdict_for(
    validator: &dyn SignificanceValidator,
    tier: Tier,
    items: &[TierItem],
    date: NaiveDate,
) -> ValidationVerdict {
    if items.is_empty() {
        return ValidationVerdict::not_significant(format!("No {} items for {}", tier, date));
    }

    if tier.is_final_authority() {
        return ValidationVerdict::significant(
            format!("{} tier is final authority; accepted without validation", tier),
            None,
        );
    }

    match validator.validate(items, tier, date).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(tier = %tier, date = %date, error = %e, "Validator failed, accepting tier");
            ValidationVerdict::significant(
                format!("Validation unavailable ({}); accepting {} items", e, tier),
                None,
            )
        }
    }
}
