//! Tier-specific search and hit normalization
//!
//! One query per tier per run, bounded to the target day in the reference time zone. Providers
//! normalise timestamps to midnight, so the following day's midnight is both sent as an
//! exclusion and filtered locally. Hits dated outside the day are dropped as well.

use super::dispatch::RateLimitedClient;
use super::types::{Tier, TierItem};
use crate::capabilities::{SearchHit, SearchProvider, SearchRequest};
use chrono::{DateTime, NaiveDate, Utc};
use daymark_common::config::{SearchConfig, TierQueryConfig, TiersConfig};
use daymark_common::time::{format_millis, parse_timestamp, DayWindow};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds tier queries and normalizes their hits
pub struct TierSearchAdapter {
    provider: Arc<dyn SearchProvider>,
    dispatcher: Arc<RateLimitedClient>,
    tiers: TiersConfig,
    max_results: u32,
    summary_query: Option<String>,
}

impl TierSearchAdapter {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        dispatcher: Arc<RateLimitedClient>,
        tiers: TiersConfig,
        search: &SearchConfig,
    ) -> Self {
        let summary_query = Some(search.summary_query.trim().to_string()).filter(|q| !q.is_empty());
        Self {
            provider,
            dispatcher,
            tiers,
            max_results: search.max_results,
            summary_query,
        }
    }

    fn profile(&self, tier: Tier) -> &TierQueryConfig {
        match tier {
            Tier::Primary => &self.tiers.primary,
            Tier::Secondary => &self.tiers.secondary,
            Tier::Tertiary => &self.tiers.tertiary,
        }
    }

    /// Query shape for `tier` on `date`
    pub fn build_request(&self, tier: Tier, date: NaiveDate) -> SearchRequest {
        let window = DayWindow::for_date(date);
        let profile = self.profile(tier);

        SearchRequest {
            text: profile.query.clone(),
            window_start: format_millis(window.start),
            window_end: format_millis(window.end),
            exclude_timestamps: vec![format_millis(window.next_midnight)],
            include_domains: profile.include_domains.clone(),
            max_results: self.max_results,
            summary_query: self.summary_query.clone(),
        }
    }

    /// Search one tier for one date
    ///
    /// Never fails: provider errors surface as an empty list.
    pub async fn search_tier(&self, tier: Tier, date: NaiveDate) -> Vec<TierItem> {
        let request = self.build_request(tier, date);
        let label = format!("search {} {}", tier, date);

        let hits = self
            .dispatcher
            .dispatch(&label, || self.provider.query(&request))
            .await;

        let raw = hits.len();
        let items = normalize_hits(tier, date, hits);
        if items.len() != raw {
            debug!(
                tier = %tier,
                date = %date,
                dropped = raw - items.len(),
                "Dropped off-day or duplicate hits"
            );
        }
        info!(tier = %tier, date = %date, count = items.len(), "Tier search complete");

        items
    }
}

/// Turn raw hits into items
///
/// Drops hits dated outside the day (including the following midnight) and repeats of an
/// already-seen URL.
/// Missing fields get tier placeholders; a missing score is 0.
pub fn normalize_hits(tier: Tier, date: NaiveDate, hits: Vec<SearchHit>) -> Vec<TierItem> {
    let window = DayWindow::for_date(date);
    let mut seen_urls = HashSet::new();
    let mut items = Vec::with_capacity(hits.len());

    for (index, hit) in hits.into_iter().enumerate() {
        let published_at = hit.published_date.as_deref().and_then(parse_timestamp);
        if published_at.is_some_and(|ts| !window.contains(ts)) {
            continue;
        }

        let url = non_blank(hit.url).unwrap_or_default();
        if !url.is_empty() && !seen_urls.insert(url.clone()) {
            continue;
        }

        let id = non_blank(hit.id)
            .or_else(|| Some(url.clone()).filter(|u| !u.is_empty()))
            .unwrap_or_else(|| format!("{}-{}-{}", tier, date, index));

        items.push(TierItem {
            id,
            title: non_blank(hit.title).unwrap_or_else(|| tier.placeholder_title().to_string()),
            url,
            published_at: published_at.unwrap_or(window.start),
            author: non_blank(hit.author),
            body: non_blank(hit.summary)
                .or_else(|| non_blank(hit.text))
                .unwrap_or_default(),
            relevance_score: hit.score.filter(|s| s.is_finite()).unwrap_or(0.0),
        });
    }

    items
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Midnight of `date` in the reference time zone
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    DayWindow::for_date(date).start
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 20).unwrap()
    }

    fn hit(url: &str, published: &str) -> SearchHit {
        SearchHit {
            id: Some(format!("id-{}", url)),
            title: Some(format!("Story {}", url)),
            url: Some(format!("https://news.example/{}", url)),
            published_date: Some(published.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_next_midnight_hits_are_dropped() {
        let hits = vec![
            hit("a", "2024-04-20T09:00:00.000Z"),
            hit("b", "2024-04-21T00:00:00.000Z"),
        ];
        let items = normalize_hits(Tier::Primary, date(), hits);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "id-a");
    }

    #[test]
    fn test_hits_outside_the_day_are_dropped() {
        let hits = vec![
            hit("a", "2024-04-19T23:59:59.999Z"),
            hit("b", "2024-04-20T23:59:59.999Z"),
            hit("c", "2024-04-22T08:30:00.000Z"),
            hit("d", "2024-04-22"),
        ];
        let items = normalize_hits(Tier::Primary, date(), hits);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "id-b");
    }

    #[test]
    fn test_duplicate_urls_collapse_to_first() {
        let mut second = hit("a", "2024-04-20T10:00:00.000Z");
        second.id = Some("other".to_string());
        let hits = vec![hit("a", "2024-04-20T09:00:00.000Z"), second];

        let items = normalize_hits(Tier::Secondary, date(), hits);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "id-a");
    }

    #[test]
    fn test_missing_fields_get_placeholders() {
        let items = normalize_hits(Tier::Tertiary, date(), vec![SearchHit::default()]);
        let item = &items[0];

        assert_eq!(item.title, Tier::Tertiary.placeholder_title());
        assert_eq!(item.relevance_score, 0.0);
        assert_eq!(item.published_at, day_start(date()));
        assert_eq!(item.id, "tertiary-2024-04-20-0");
        assert!(item.body.is_empty());
        assert!(item.author.is_none());
    }

    #[test]
    fn test_summary_preferred_over_text() {
        let mut with_both = hit("a", "2024-04-20");
        with_both.text = Some("full text".to_string());
        with_both.summary = Some("short summary".to_string());
        let mut text_only = hit("b", "2024-04-20");
        text_only.text = Some("only text".to_string());
        text_only.score = Some(0.8);

        let items = normalize_hits(Tier::Primary, date(), vec![with_both, text_only]);
        assert_eq!(items[0].body, "short summary");
        assert_eq!(items[1].body, "only text");
        assert_eq!(items[1].relevance_score, 0.8);
    }
}
