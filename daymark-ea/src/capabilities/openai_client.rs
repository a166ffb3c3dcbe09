//! Language-model client (OpenAI-compatible chat completions)
//!
//! One client serves as both significance validator and summarizer for a provider id. The
//! validator asks for a JSON object `{isSignificant, reasoning, topArticleId}`; the summarizer
//! asks for plain text.

use super::{SignificanceValidator, Summarizer};
use crate::error::CapabilityError;
use crate::waterfall::types::{Tier, TierItem, ValidationVerdict};
use chrono::NaiveDate;
use daymark_common::config::{LlmConfig, SummaryConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Items shown to the validator per call
const MAX_VALIDATION_ITEMS: usize = 10;

/// Body characters shown per item
const MAX_ITEM_CHARS: usize = 600;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Validator reply, in the wire format the prompt asks for
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerdictReply {
    is_significant: bool,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    top_article_id: Option<String>,
}

/// Chat-completions client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    min_chars: usize,
    max_chars: usize,
}

impl OpenAiClient {
    pub fn new(
        config: &LlmConfig,
        summary: &SummaryConfig,
        api_key: Option<String>,
    ) -> Result<Self, CapabilityError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            min_chars: summary.min_chars,
            max_chars: summary.max_chars,
        })
    }

    async fn complete(&self, system: &str, user: &str, json_mode: bool) -> Result<String, CapabilityError> {
        let Some(api_key) = &self.api_key else {
            return Err(CapabilityError::Unavailable(
                "language model API key not configured".to_string(),
            ));
        };

        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Status(status.as_u16(), error_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| CapabilityError::Parse("empty completion".to_string()))
    }
}

fn tier_focus(tier: Tier) -> &'static str {
    match tier {
        Tier::Primary => "Bitcoin news events: protocol releases, network events, exchange incidents, adoption announcements",
        Tier::Secondary => "cryptocurrency and web3 news events with clear industry impact",
        Tier::Tertiary => "major financial or political news events",
    }
}

/// Render items for a prompt, one block per item
fn format_items(items: &[TierItem]) -> String {
    items
        .iter()
        .take(MAX_VALIDATION_ITEMS)
        .map(|item| {
            let body: String = item.body.chars().take(MAX_ITEM_CHARS).collect();
            format!(
                "ID: {}\nTitle: {}\nPublished: {}\nURL: {}\nContent: {}",
                item.id,
                item.title,
                item.published_at.format("%Y-%m-%d"),
                item.url,
                body
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Decode a validator reply
fn parse_verdict(content: &str) -> Result<ValidationVerdict, CapabilityError> {
    let reply: VerdictReply =
        serde_json::from_str(content).map_err(|e| CapabilityError::Parse(e.to_string()))?;

    Ok(ValidationVerdict {
        is_significant: reply.is_significant,
        reasoning: reply.reasoning,
        selected_item_id: reply.top_article_id.filter(|id| !id.trim().is_empty()),
    })
}

#[async_trait::async_trait]
impl SignificanceValidator for OpenAiClient {
    async fn validate(
        &self,
        items: &[TierItem],
        tier: Tier,
        date: NaiveDate,
    ) -> Result<ValidationVerdict, CapabilityError> {
        let system = "You validate whether news articles report real, date-specific events. \
                      Reject explainers, tutorials, predictions, opinion pieces and roundups. \
                      Respond with JSON only.";
        let user = format!(
            "Date: {date}\nFocus: {focus}\n\nDo any of these articles report {focus} that happened on {date}?\n\n{items}\n\n\
             Respond with a JSON object: {{\"isSignificant\": true/false, \"reasoning\": \"brief explanation\", \
             \"topArticleId\": \"id of the most relevant article, only when significant\"}}",
            date = date,
            focus = tier_focus(tier),
            items = format_items(items),
        );

        let content = self.complete(system, &user, true).await?;
        let verdict = parse_verdict(&content)?;
        debug!(
            tier = %tier,
            date = %date,
            significant = verdict.is_significant,
            "Validator verdict received"
        );
        Ok(verdict)
    }
}

#[async_trait::async_trait]
impl Summarizer for OpenAiClient {
    async fn summarize(&self, item: &TierItem, date: NaiveDate) -> Result<String, CapabilityError> {
        let system = format!(
            "You write one-sentence event descriptions of exactly {}-{} characters including spaces, \
             in past tense, with no ending punctuation.",
            self.min_chars, self.max_chars
        );
        let user = format!(
            "Describe the event of {} reported here.\nTitle: {}\nContent: {}",
            date,
            item.title,
            item.body.chars().take(MAX_ITEM_CHARS).collect::<String>()
        );

        self.complete(&system, &user, false).await
    }
}
