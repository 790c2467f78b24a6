/// Configuration management using figment
///
/// Loads configuration with this precedence (highest wins):
/// 1. Defaults (hardcoded)
/// 2. TOML file: munchies.toml (in working directory)
/// 3. Environment variables: prefixed MUNCHIES_ (e.g., MUNCHIES_LOG_LEVEL=debug),
///    nested sections split on `__` (e.g., MUNCHIES_ENRICHMENT__PROVIDER=gemini)

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Toml, Serialized},
};
use serde::{Deserialize, Serialize};
use crate::errors::MunchiesError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional file path for log output (in addition to stderr)
    #[serde(default)]
    pub log_file: Option<String>,

    /// Directory holding the JSON documents below.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Base restaurant catalog, read-only at request time.
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,

    /// Restaurants persisted by AI enrichment.
    #[serde(default = "default_fetched_file")]
    pub fetched_file: String,

    /// Append-only user interaction log.
    #[serde(default = "default_interactions_file")]
    pub interactions_file: String,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Settings for the external AI provider used to enrich the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Master switch; when false no provider is constructed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// "openai", "gemini" or "ollama". Unset: picked from the API keys present.
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// Candidates requested per AI call.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Upper bound on a single AI call; a timeout counts as "no candidates".
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_catalog_file() -> String {
    "restaurants.json".to_string()
}

fn default_fetched_file() -> String {
    "ai_fetched_restaurants.json".to_string()
}

fn default_interactions_file() -> String {
    "user_interactions.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        EnrichmentConfig {
            enabled: default_true(),
            provider: None,
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            gemini_api_key: None,
            gemini_base_url: default_gemini_base_url(),
            gemini_model: default_gemini_model(),
            ollama_base_url: default_ollama_base_url(),
            ollama_model: default_ollama_model(),
            max_results: default_max_results(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn has_key(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

impl EnrichmentConfig {
    /// Provider to construct: the configured one, else gemini when its key is
    /// set, else openai.
    pub fn active_provider(&self) -> &str {
        match self.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(provider) => provider,
            None if has_key(&self.gemini_api_key) => "gemini",
            None => "openai",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_log_level(),
            log_file: None,
            data_dir: default_data_dir(),
            catalog_file: default_catalog_file(),
            fetched_file: default_fetched_file(),
            interactions_file: default_interactions_file(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, TOML file, and environment variables
    ///
    /// Environment variables override TOML file values.
    /// Example: MUNCHIES_LOG_LEVEL=debug overrides log_level in munchies.toml
    ///
    /// The bare OPENAI_API_KEY / GEMINI_API_KEY variables are used when no key
    /// was configured through figment.
    pub fn load() -> Result<Config, MunchiesError> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("munchies.toml"))
            .merge(Env::prefixed("MUNCHIES_").split("__"))
            .extract()
            .map_err(|e| MunchiesError::Config(format!("Failed to load config: {}", e)))?;

        if config.enrichment.openai_api_key.is_none() {
            config.enrichment.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if config.enrichment.gemini_api_key.is_none() {
            config.enrichment.gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        }

        Ok(config)
    }

    pub fn catalog_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.catalog_file)
    }

    pub fn fetched_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.fetched_file)
    }

    pub fn interactions_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.interactions_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_file, None);
        assert_eq!(config.catalog_path(), PathBuf::from("data").join("restaurants.json"));
        assert_eq!(config.enrichment.max_results, 5);
        assert_eq!(config.enrichment.timeout_secs, 30);
        assert_eq!(config.enrichment.provider, None);
        assert_eq!(config.enrichment.active_provider(), "openai");
    }

    #[test]
    fn test_provider_follows_gemini_key() {
        let settings = EnrichmentConfig {
            gemini_api_key: Some("g-key".to_string()),
            ..EnrichmentConfig::default()
        };
        assert_eq!(settings.active_provider(), "gemini");
    }

    #[test]
    fn test_provider_follows_openai_key() {
        let settings = EnrichmentConfig {
            openai_api_key: Some("sk-key".to_string()),
            ..EnrichmentConfig::default()
        };
        assert_eq!(settings.active_provider(), "openai");
    }

    #[test]
    fn test_gemini_wins_when_both_keys_set() {
        let settings = EnrichmentConfig {
            openai_api_key: Some("sk-key".to_string()),
            gemini_api_key: Some("g-key".to_string()),
            ..EnrichmentConfig::default()
        };
        assert_eq!(settings.active_provider(), "gemini");

        // Blank keys do not count
        let blank = EnrichmentConfig {
            gemini_api_key: Some("  ".to_string()),
            ..EnrichmentConfig::default()
        };
        assert_eq!(blank.active_provider(), "openai");
    }

    #[test]
    fn test_explicit_provider_wins_over_keys() {
        let settings = EnrichmentConfig {
            provider: Some("ollama".to_string()),
            gemini_api_key: Some("g-key".to_string()),
            ..EnrichmentConfig::default()
        };
        assert_eq!(settings.active_provider(), "ollama");
    }

    #[test]
    fn test_store_paths_follow_data_dir() {
        let config = Config {
            data_dir: "/tmp/munchies".to_string(),
            ..Config::default()
        };
        assert_eq!(config.fetched_path(), PathBuf::from("/tmp/munchies/ai_fetched_restaurants.json"));
        assert_eq!(config.interactions_path(), PathBuf::from("/tmp/munchies/user_interactions.json"));
    }
}
