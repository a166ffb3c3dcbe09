//! News search client (Exa-compatible JSON API)
//!
//! `POST {base_url}/search` with an `x-api-key` header. Throttling is not done here; every call
//! already passes through the shared dispatcher.

use super::{SearchHit, SearchProvider, SearchRequest};
use crate::error::CapabilityError;
use daymark_common::config::SearchConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("daymark/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    query: &'a str,
    #[serde(rename = "type")]
    search_type: &'static str,
    category: &'static str,
    start_published_date: &'a str,
    end_published_date: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    exclude_text: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    include_domains: &'a [String],
    num_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    contents: Option<Contents<'a>>,
}

fn is_empty(values: &&[String]) -> bool {
    values.is_empty()
}

#[derive(Debug, Serialize)]
struct Contents<'a> {
    summary: SummaryContents<'a>,
}

#[derive(Debug, Serialize)]
struct SummaryContents<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaResult {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    published_date: Option<String>,
    author: Option<String>,
    text: Option<String>,
    summary: Option<String>,
    score: Option<f64>,
}

impl From<ExaResult> for SearchHit {
    fn from(r: ExaResult) -> Self {
        SearchHit {
            id: r.id,
            title: r.title,
            url: r.url,
            published_date: r.published_date,
            author: r.author,
            text: r.text,
            summary: r.summary,
            score: r.score,
        }
    }
}

/// HTTP search provider
pub struct ExaSearchClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExaSearchClient {
    pub fn new(config: &SearchConfig, api_key: Option<String>) -> Result<Self, CapabilityError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

fn body(request: &SearchRequest) -> SearchBody<'_> {
    SearchBody {
        query: &request.text,
        search_type: "neural",
        category: "news",
        start_published_date: &request.window_start,
        end_published_date: &request.window_end,
        exclude_text: &request.exclude_timestamps,
        include_domains: &request.include_domains,
        num_results: request.max_results,
        contents: request.summary_query.as_deref().map(|query| Contents {
            summary: SummaryContents { query },
        }),
    }
}

#[async_trait::async_trait]
impl SearchProvider for ExaSearchClient {
    async fn query(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError> {
        let Some(api_key) = &self.api_key else {
            return Err(CapabilityError::Unavailable(
                "search API key not configured".to_string(),
            ));
        };

        tracing::debug!(
            query = %request.text,
            start = %request.window_start,
            domains = request.include_domains.len(),
            "Querying search API"
        );

        let response = self
            .http_client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", api_key)
            .json(&body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Status(status.as_u16(), error_text));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Parse(e.to_string()))?;

        Ok(parsed.results.into_iter().map(SearchHit::from).collect())
    }
}
