//! Fallback policy once every tier is exhausted
//!
//! Order: exact-date historical record, then a generic "no significant event" item. The
//! pipeline always ends with an item; lookup failures only narrow the choice.

use super::tier_search::day_start;
use super::types::{HistoricalRecord, TierItem, WinningTier};
use crate::capabilities::HistoricalKnowledgeBase;
use chrono::NaiveDate;
use tracing::{info, warn};

/// Fixed description used when nothing was found (within the summary length contract)
pub const NO_EVENT_MARKER: &str =
    "No significant date-specific event was found for this day in any of the priority news domains searched";

/// Title of the generic fallback item
pub const NO_EVENT_TITLE: &str = "No significant event";

/// Pick the fallback winner for `date`
pub async fn resolve_exhausted(
    historical: &dyn HistoricalKnowledgeBase,
    date: NaiveDate,
) -> (WinningTier, TierItem) {
    match historical.lookup(date).await {
        Ok(Some(record)) => {
            info!(date = %date, title = %record.title, "Using historical record");
            (WinningTier::HistoricalFallback, historical_item(&record))
        }
        Ok(None) => {
            info!(date = %date, "No historical record, using generic fallback");
            (WinningTier::GenericFallback, generic_item(date))
        }
        Err(e) => {
            warn!(date = %date, error = %e, "Historical lookup failed, using generic fallback");
            (WinningTier::GenericFallback, generic_item(date))
        }
    }
}

pub fn historical_item(record: &HistoricalRecord) -> TierItem {
    TierItem {
        id: format!("historical-{}", record.date),
        title: record.title.clone(),
        url: record.sources.first().cloned().unwrap_or_default(),
        published_at: day_start(record.date),
        author: None,
        body: record.description.clone(),
        relevance_score: 1.0,
    }
}

pub fn generic_item(date: NaiveDate) -> TierItem {
    TierItem {
        id: format!("generic-fallback-{}", date),
        title: NO_EVENT_TITLE.to_string(),
        url: String::new(),
        published_at: day_start(date),
        author: None,
        body: NO_EVENT_MARKER.to_string(),
        relevance_score: 0.0,
    }
}
