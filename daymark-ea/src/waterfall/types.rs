// Shared types and data contracts for the date-analysis pipeline
//
// Items and outcomes are built once per run and never mutated afterwards. Request-key state
// lives only inside the RequestCoordinator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Request identity
// ============================================================================

/// Deduplication identity: one analysis per (date, provider)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub date: NaiveDate,
    pub provider: String,
}

impl RequestKey {
    pub fn new(date: NaiveDate, provider: impl Into<String>) -> Self {
        Self {
            date,
            provider: provider.into(),
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.date, self.provider)
    }
}

// ============================================================================
// Tiers
// ============================================================================

/// Topical priority domain, searched in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Secondary,
    Tertiary,
}

impl Tier {
    /// Next lower-priority tier, if any
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Primary => Some(Tier::Secondary),
            Tier::Secondary => Some(Tier::Tertiary),
            Tier::Tertiary => None,
        }
    }

    /// Final-authority tier: any non-empty result is significant
    pub fn is_final_authority(self) -> bool {
        matches!(self, Tier::Tertiary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Primary => "primary",
            Tier::Secondary => "secondary",
            Tier::Tertiary => "tertiary",
        }
    }

    /// Title used when a hit arrives without one
    pub fn placeholder_title(self) -> &'static str {
        match self {
            Tier::Primary => "Untitled primary-domain article",
            Tier::Secondary => "Untitled secondary-domain article",
            Tier::Tertiary => "Untitled general-news article",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Items and verdicts
// ============================================================================

/// One normalized search hit for a tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Provider summary, or body text when no summary was returned
    pub body: String,
    /// Provider relevance, 0.0 when absent
    pub relevance_score: f64,
}

impl TierItem {
    /// Highest relevance score; the earliest item wins ties
    pub fn most_relevant(items: &[TierItem]) -> Option<&TierItem> {
        items.iter().reduce(|best, item| {
            if item.relevance_score > best.relevance_score {
                item
            } else {
                best
            }
        })
    }
}

/// Significance judgement for one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_significant: bool,
    pub reasoning: String,
    /// Missing means "highest relevance score"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_item_id: Option<String>,
}

impl ValidationVerdict {
    pub fn significant(reasoning: impl Into<String>, selected_item_id: Option<String>) -> Self {
        Self {
            is_significant: true,
            reasoning: reasoning.into(),
            selected_item_id,
        }
    }

    pub fn not_significant(reasoning: impl Into<String>) -> Self {
        Self {
            is_significant: false,
            reasoning: reasoning.into(),
            selected_item_id: None,
        }
    }

    /// Item this verdict points at: the named id, else the most relevant item
    pub fn pick<'a>(&self, items: &'a [TierItem]) -> Option<&'a TierItem> {
        self.selected_item_id
            .as_deref()
            .and_then(|id| items.iter().find(|item| item.id == id))
            .or_else(|| TierItem::most_relevant(items))
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Where the winning item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinningTier {
    Primary,
    Secondary,
    Tertiary,
    HistoricalFallback,
    GenericFallback,
}

impl From<Tier> for WinningTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Primary => WinningTier::Primary,
            Tier::Secondary => WinningTier::Secondary,
            Tier::Tertiary => WinningTier::Tertiary,
        }
    }
}

/// One entry of the search path: a tier that was actually queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStep {
    pub tier: Tier,
    pub count: usize,
}

/// Verdict recorded for a queried tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierVerdict {
    pub tier: Tier,
    pub verdict: ValidationVerdict,
}

/// Result of one waterfall run
///
/// `all_tier_items` and `search_path` cover exactly the tiers that were queried; a tier skipped
/// by early termination has no entry in either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallOutcome {
    pub winning_tier: WinningTier,
    pub selected_item: TierItem,
    pub all_tier_items: BTreeMap<Tier, Vec<TierItem>>,
    pub search_path: Vec<SearchStep>,
    pub validation_verdicts: Vec<TierVerdict>,
}

impl WaterfallOutcome {
    /// Total items examined across queried tiers
    pub fn total_items(&self) -> usize {
        self.search_path.iter().map(|step| step.count).sum()
    }
}

/// Static historical record for an exact date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

// ============================================================================
// Finished analysis
// ============================================================================

/// Provenance of the final summary text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Summarization capability met the length contract
    Capability,
    /// Deterministic local generator after the capability failed
    LocalGenerator,
    /// Fixed "no significant event" marker
    FixedMarker,
}

/// Completed analysis for one (date, provider)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAnalysis {
    pub request_id: Uuid,
    pub date: NaiveDate,
    pub provider: String,
    pub outcome: WaterfallOutcome,
    pub summary: String,
    pub summary_source: SummarySource,
    pub analyzed_at: DateTime<Utc>,
}
