//! Service assembly from configuration
//!
//! Resolves API keys (environment → TOML) and wires the concrete capabilities into a
//! [`DayAnalyzer`]. A missing key is not fatal: the affected capability reports itself
//! unavailable and the pipeline degrades (empty searches, fail-open validation, local summaries).

use crate::capabilities::{
    ExaSearchClient, InMemoryRecordStore, OpenAiClient, ProviderRegistry, ProviderSet,
    StaticHistoricalKnowledge,
};
use crate::waterfall::DayAnalyzer;
use daymark_common::config::{
    resolve_api_key, TomlConfig, LLM_API_KEY_ENV_VAR, SEARCH_API_KEY_ENV_VAR,
};
use daymark_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// API keys resolved for this process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedKeys {
    pub search: Option<String>,
    pub llm: Option<String>,
}

/// Resolve every API key, warning about the ones that are missing
pub fn resolve_keys(config: &TomlConfig) -> ResolvedKeys {
    let search = resolve_api_key(
        "Search",
        SEARCH_API_KEY_ENV_VAR,
        config.search.api_key.as_deref(),
    );
    if search.is_none() {
        warn!(
            "Search API key not configured (set {} or [search] api_key). Every tier search will be empty.",
            SEARCH_API_KEY_ENV_VAR
        );
    }

    let llm = resolve_api_key("LLM", LLM_API_KEY_ENV_VAR, config.llm.api_key.as_deref());
    if llm.is_none() {
        warn!(
            "LLM API key not configured (set {} or [llm] api_key). Validation fails open and summaries are generated locally.",
            LLM_API_KEY_ENV_VAR
        );
    }

    ResolvedKeys { search, llm }
}

/// Provider registry holding the configured language model
pub fn build_providers(config: &TomlConfig, keys: &ResolvedKeys) -> Result<ProviderRegistry> {
    let client = OpenAiClient::new(&config.llm, &config.summary, keys.llm.clone())
        .map_err(|e| Error::Config(format!("LLM client: {}", e)))?;
    let client = Arc::new(client);

    let mut providers = ProviderRegistry::new();
    providers.insert(
        config.llm.provider.clone(),
        ProviderSet {
            validator: client.clone(),
            summarizer: client,
        },
    );
    Ok(providers)
}

/// Assemble the analyzer with HTTP capabilities and in-memory storage
pub fn build_analyzer(config: &TomlConfig) -> Result<DayAnalyzer> {
    let keys = resolve_keys(config);

    let search = ExaSearchClient::new(&config.search, keys.search.clone())
        .map_err(|e| Error::Config(format!("Search client: {}", e)))?;
    let providers = build_providers(config, &keys)?;

    info!(
        providers = ?providers.keys().collect::<Vec<_>>(),
        max_in_flight = config.dispatch.max_in_flight,
        min_interval_ms = config.dispatch.min_interval_ms,
        "Analyzer configured"
    );

    Ok(DayAnalyzer::new(
        config,
        Arc::new(search),
        Arc::new(StaticHistoricalKnowledge::new()),
        Arc::new(InMemoryRecordStore::new()),
        providers,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_uses_configured_provider_id() {
        let mut config = TomlConfig::default();
        config.llm.provider = "local-llm".to_string();

        let providers = build_providers(&config, &ResolvedKeys::default()).unwrap();

        assert_eq!(providers.len(), 1);
        assert!(providers.contains_key("local-llm"));
    }
}
