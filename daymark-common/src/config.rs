//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`DAYMARK_CONFIG`)
//! 3. Platform config directory (`<config dir>/daymark/daymark.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable file never stops startup: a warning is logged and compiled defaults
//! are used. API keys may additionally be supplied through the environment, which wins over TOML.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "DAYMARK_CONFIG";

/// Environment variable carrying the search API key
pub const SEARCH_API_KEY_ENV_VAR: &str = "DAYMARK_SEARCH_API_KEY";

/// Environment variable carrying the language-model API key
pub const LLM_API_KEY_ENV_VAR: &str = "DAYMARK_LLM_API_KEY";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub search: SearchConfig,
    pub dispatch: DispatchConfig,
    pub coordinator: CoordinatorConfig,
    pub llm: LlmConfig,
    pub summary: SummaryConfig,
    pub tiers: TiersConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log file path (logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5731,
        }
    }
}

/// News search provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Hits requested per tier query
    pub max_results: u32,
    /// Instruction for the provider's per-hit summary
    pub summary_query: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.exa.ai".to_string(),
            api_key: None,
            max_results: 10,
            summary_query: "Create 50 words summary".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Throttle applied to every search dispatch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum concurrent in-flight searches
    pub max_in_flight: usize,
    /// Minimum spacing between dispatch starts
    pub min_interval_ms: u64,
}

impl DispatchConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 3,
            min_interval_ms: 200,
        }
    }
}

/// Request coalescing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How long a successful outcome answers repeat requests
    pub recent_ttl_secs: u64,
}

impl CoordinatorConfig {
    pub fn recent_ttl(&self) -> Duration {
        Duration::from_secs(self.recent_ttl_secs)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            recent_ttl_secs: 300,
        }
    }
}

/// Language-model endpoint (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider id callers use to select this model
    pub provider: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Summary length contract and retry budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummaryConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    /// Retries after the first attempt violates the contract
    pub max_retries: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            min_chars: 100,
            max_chars: 110,
            max_retries: 3,
        }
    }
}

/// Search profile for one tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierQueryConfig {
    pub query: String,
    #[serde(default)]
    pub include_domains: Vec<String>,
}

impl TierQueryConfig {
    fn new(query: &str, include_domains: &[&str]) -> Self {
        Self {
            query: query.to_string(),
            include_domains: include_domains.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Search profiles for the three priority tiers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TiersConfig {
    pub primary: TierQueryConfig,
    pub secondary: TierQueryConfig,
    pub tertiary: TierQueryConfig,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            primary: TierQueryConfig::new(
                "bitcoin news, ecosystem updates, halvings, important days",
                &[],
            ),
            secondary: TierQueryConfig::new(
                "important cryptocurrency web3 news, no predictions or analysis",
                &[],
            ),
            tertiary: TierQueryConfig::new(
                "important financial political news",
                &[
                    "news.bbc.co.uk",
                    "bbc.com",
                    "reuters.com",
                    "washingtonpost.com",
                    "nytimes.com",
                    "cnn.com",
                    "wsj.com",
                    "ft.com",
                    "bloomberg.com",
                    "forbes.com",
                    "economist.com",
                    "fortune.com",
                    "aljazeera.com",
                ],
            ),
        }
    }
}

/// Resolves which config file to load
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Path of the config file to load, if any source names one
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path().filter(|p| p.exists())
    }

    /// Load configuration, falling back to compiled defaults
    pub fn load(&self) -> TomlConfig {
        let Some(path) = self.resolve_path() else {
            info!("No config file found, using compiled defaults");
            return TomlConfig::default();
        };

        match load_toml_config(&path) {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}. Using compiled defaults.", e);
                TomlConfig::default()
            }
        }
    }
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("daymark").join("daymark.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve an API key from environment, then TOML
///
/// Returns `None` when neither source holds a usable key. Logs a warning when both do.
pub fn resolve_api_key(label: &str, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    match (env_key, toml_key) {
        (Some(env_key), Some(_)) => {
            warn!(
                "{} API key found in environment and TOML. Using environment ({}).",
                label, env_var
            );
            Some(env_key)
        }
        (Some(env_key), None) => {
            info!("{} API key loaded from environment variable", label);
            Some(env_key)
        }
        (None, Some(toml_key)) => {
            info!("{} API key loaded from TOML config", label);
            Some(toml_key.to_string())
        }
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dispatch_contract() {
        let config = TomlConfig::default();
        assert_eq!(config.dispatch.max_in_flight, 3);
        assert_eq!(config.dispatch.min_interval(), Duration::from_millis(200));
        assert_eq!(config.coordinator.recent_ttl(), Duration::from_secs(300));
        assert_eq!(config.summary.min_chars, 100);
        assert_eq!(config.summary.max_chars, 110);
        assert_eq!(config.summary.max_retries, 3);
    }

    #[test]
    fn test_default_tertiary_tier_restricts_domains() {
        let tiers = TiersConfig::default();
        assert!(tiers.primary.include_domains.is_empty());
        assert!(tiers.tertiary.include_domains.contains(&"reuters.com".to_string()));
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
