//! Summarization gate
//!
//! The winning item is described in `min_chars..=max_chars` characters. The length contract
//! applies to the capability's reply; ending punctuation (`. ! , ; : -`) is removed afterwards.
//! The summarization capability gets one attempt plus `max_retries` retries; an
//! error counts as a failed attempt. After that a deterministic local generator builds the text
//! from the item's title and body. Its output must pass the quality gate, otherwise no usable
//! summary exists and the analysis fails.
//!
//! A generic-fallback outcome uses the fixed marker and never calls the capability.

use super::fallback::NO_EVENT_MARKER;
use super::types::{SummarySource, TierItem, WaterfallOutcome, WinningTier};
use crate::capabilities::Summarizer;
use crate::error::AnalysisError;
use chrono::NaiveDate;
use daymark_common::config::SummaryConfig;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Quality issue kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityIssue {
    TooShort,
    TooLong,
    /// Two or more consecutive dots
    ExcessiveDots,
    /// No letters at all
    PlaceholderText,
    /// A word longer than three characters used three or more times
    RepeatedWords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl QualityIssue {
    pub fn severity(self) -> Severity {
        match self {
            QualityIssue::TooShort | QualityIssue::TooLong | QualityIssue::PlaceholderText => {
                Severity::High
            }
            QualityIssue::ExcessiveDots => Severity::Medium,
            QualityIssue::RepeatedWords => Severity::Low,
        }
    }
}

/// Accepted summary text and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct GatedSummary {
    pub text: String,
    pub source: SummarySource,
    /// Capability attempts made (0 for the fixed marker)
    pub attempts: u32,
}

/// Applies the length contract, retries, and the local fallback
#[derive(Debug, Clone)]
pub struct SummaryGate {
    config: SummaryConfig,
}

impl SummaryGate {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    /// Summarize the outcome's selected item
    pub async fn summarize(
        &self,
        summarizer: &dyn Summarizer,
        outcome: &WaterfallOutcome,
        date: NaiveDate,
    ) -> Result<GatedSummary, AnalysisError> {
        if outcome.winning_tier == WinningTier::GenericFallback {
            return Ok(GatedSummary {
                text: NO_EVENT_MARKER.to_string(),
                source: SummarySource::FixedMarker,
                attempts: 0,
            });
        }

        let item = &outcome.selected_item;
        let total_attempts = self.config.max_retries + 1;

        for attempt in 1..=total_attempts {
            match summarizer.summarize(item, date).await {
                Ok(raw) => {
                    let text = strip_ending_punctuation(&raw);
                    let issues = self.check_reply(raw.trim(), &text);
                    if passes(&issues) {
                        info!(date = %date, attempt, chars = text.chars().count(), "Summary accepted");
                        return Ok(GatedSummary {
                            text,
                            source: SummarySource::Capability,
                            attempts: attempt,
                        });
                    }
                    warn!(
                        date = %date,
                        attempt,
                        chars = text.chars().count(),
                        issues = ?issues,
                        "Summary rejected"
                    );
                }
                Err(e) => {
                    warn!(date = %date, attempt, error = %e, "Summarizer failed");
                }
            }
        }

        let text = self.local_summary(item);
        let issues = self.check_quality(&text);
        if passes(&issues) {
            info!(date = %date, chars = text.chars().count(), "Using locally generated summary");
            return Ok(GatedSummary {
                text,
                source: SummarySource::LocalGenerator,
                attempts: total_attempts,
            });
        }

        debug!(date = %date, text = %text, "Local summary rejected");
        Err(AnalysisError::SummaryUnavailable {
            date: date.to_string(),
            reason: format!(
                "{} summarizer attempts failed and local summary has issues {:?}",
                total_attempts, issues
            ),
        })
    }

    /// Deterministic summary from the item's title and body
    ///
    /// Words are appended while the text stays within `max_chars`; ending punctuation is removed.
    pub fn local_summary(&self, item: &TierItem) -> String {
        let mut text = String::new();
        let mut chars = 0;

        for word in item.title.split_whitespace().chain(item.body.split_whitespace()) {
            let word_chars = word.chars().count();
            let needed = if text.is_empty() { word_chars } else { word_chars + 1 };
            if chars + needed > self.config.max_chars {
                break;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
            chars += needed;
        }

        strip_ending_punctuation(&text)
    }

    /// Quality issues found in `text`
    pub fn check_quality(&self, text: &str) -> Vec<QualityIssue> {
        self.check_reply(text, text)
    }

    /// Length measured on the raw reply, content on the stripped text
    fn check_reply(&self, raw: &str, text: &str) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        let chars = raw.chars().count();

        if chars < self.config.min_chars {
            issues.push(QualityIssue::TooShort);
        }
        if chars > self.config.max_chars {
            issues.push(QualityIssue::TooLong);
        }
        if text.contains("..") {
            issues.push(QualityIssue::ExcessiveDots);
        }
        if !text.chars().any(char::is_alphabetic) {
            issues.push(QualityIssue::PlaceholderText);
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if word.chars().count() > 3 {
                *counts.entry(word).or_default() += 1;
            }
        }
        if counts.values().any(|&n| n >= 3) {
            issues.push(QualityIssue::RepeatedWords);
        }

        issues
    }
}

fn passes(issues: &[QualityIssue]) -> bool {
    issues.iter().all(|issue| issue.severity() == Severity::Low)
}

/// Sentence punctuation a summary must not end with
const ENDING_PUNCTUATION: [char; 6] = ['.', '!', ',', ';', ':', '-'];

fn strip_ending_punctuation(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c: char| ENDING_PUNCTUATION.contains(&c) || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gate() -> SummaryGate {
        SummaryGate::new(SummaryConfig::default())
    }

    fn item(title: &str, body: &str) -> TierItem {
        TierItem {
            id: "x".to_string(),
            title: title.to_string(),
            url: String::new(),
            published_at: Utc::now(),
            author: None,
            body: body.to_string(),
            relevance_score: 0.0,
        }
    }

    #[test]
    fn test_quality_flags_length() {
        assert_eq!(gate().check_quality("Short text"), vec![QualityIssue::TooShort]);
        let long = "word ".repeat(40);
        assert!(gate().check_quality(&long).contains(&QualityIssue::TooLong));
    }

    #[test]
    fn test_quality_flags_dots_and_placeholders() {
        let dotted = format!("{}.. trailing", "a".repeat(100));
        assert!(gate().check_quality(&dotted).contains(&QualityIssue::ExcessiveDots));

        let digits = "1".repeat(105);
        assert!(gate().check_quality(&digits).contains(&QualityIssue::PlaceholderText));
    }

    #[test]
    fn test_repeated_words_are_low_severity() {
        let text = "Bitcoin rallies as Bitcoin miners celebrate while Bitcoin holders watch markets move higher across exchanges";
        let issues = gate().check_quality(text);
        assert_eq!(issues, vec![QualityIssue::RepeatedWords]);
        assert!(passes(&issues));
    }

    #[test]
    fn test_local_summary_stays_within_limit_without_ending_punctuation() {
        let source = item(
            "Bitcoin network completes its third halving event.",
            "Block rewards for miners dropped from 12.5 to 6.25 bitcoin per block as the network passed height 630000 today.",
        );
        let text = gate().local_summary(&source);

        let len = text.chars().count();
        assert!((100..=110).contains(&len), "len {} for {:?}", len, text);
        assert!(!text.ends_with('.'));
        assert!(text.starts_with("Bitcoin network completes"));
    }

    #[test]
    fn test_strip_ending_punctuation() {
        assert_eq!(strip_ending_punctuation("  Done. "), "Done");
        assert_eq!(strip_ending_punctuation("Halving confirmed! -"), "Halving confirmed");
        assert_eq!(strip_ending_punctuation("v1.0 released"), "v1.0 released");
    }

    #[test]
    fn test_strip_keeps_meaningful_trailing_symbols() {
        assert_eq!(
            strip_ending_punctuation("Bitcoin price rises 12%"),
            "Bitcoin price rises 12%"
        );
        assert_eq!(
            strip_ending_punctuation("Coinbase lists new token (BTC)"),
            "Coinbase lists new token (BTC)"
        );
        assert_eq!(
            strip_ending_punctuation("Regulator calls the asset \"speculative\"."),
            "Regulator calls the asset \"speculative\""
        );
    }

    struct FixedReply {
        reply: String,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Summarizer for FixedReply {
        async fn summarize(&self, _item: &TierItem, _date: NaiveDate) -> Result<String, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_length_is_measured_before_stripping() {
        // 100 characters including the final period
        let reply = "Bitcoin miners saw the block subsidy fall to 3.125 BTC as the fourth halving arrived at height 840k.";
        assert_eq!(reply.chars().count(), 100);
        let summarizer = FixedReply {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        };
        let outcome = WaterfallOutcome {
            winning_tier: WinningTier::Primary,
            selected_item: item("Fourth halving", "Subsidy cut"),
            all_tier_items: BTreeMap::new(),
            search_path: vec![],
            validation_verdicts: vec![],
        };
        let date = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();

        let summary = gate().summarize(&summarizer, &outcome, date).await.unwrap();

        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.attempts, 1);
        assert_eq!(summary.source, SummarySource::Capability);
        assert_eq!(summary.text, reply.trim_end_matches('.'));
    }
}
