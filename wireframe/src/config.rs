//! Configuration for the wireframe generation core.
//!
//! Loaded from a TOML file or from `WIREFRAME_*` environment variables, with
//! defaults that work against an OpenAI-compatible endpoint. Retry count and
//! request timeout are explicit configuration rather than hidden constants.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireframeConfig {
    /// Generative text service configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name/identifier
    pub model: String,
    /// API key (can be loaded from env)
    pub api_key: Option<String>,
    /// Base URL for the chat-completions API (optional, for custom endpoints)
    pub base_url: Option<String>,
    /// Maximum tokens per completion (None = provider default)
    pub max_tokens: Option<u32>,
    /// Temperature for the extraction-sensitive pipeline stages
    /// (0.0 = deterministic)
    pub stage_temperature: f64,
    /// Temperature reserved for conversational framing outside this core
    pub conversational_temperature: f64,
    /// Fixed retry budget for transient failures (no backoff)
    pub max_retries: u32,
    /// Per-request timeout; None lets the call run until the service ends it
    pub timeout_seconds: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: None,
            stage_temperature: 0.0,
            conversational_temperature: 0.7,
            max_retries: 3,
            timeout_seconds: None,
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether caching is enabled; when disabled, get/set are no-ops and the
    /// pipeline always runs
    pub enabled: bool,
    /// Cache TTL in seconds, fixed per process (not per entry)
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600, // 1 hour
        }
    }
}

impl Default for WireframeConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl WireframeConfig {
    /// Create a configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: WireframeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Create a configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = WireframeConfig::default();

        if let Ok(model) = std::env::var("WIREFRAME_LLM_MODEL") {
            config.llm.model = model;
        }
        config.llm.api_key = std::env::var("WIREFRAME_LLM_API_KEY").ok();
        config.llm.base_url = std::env::var("WIREFRAME_LLM_BASE_URL").ok();
        if let Ok(tokens) = std::env::var("WIREFRAME_LLM_MAX_TOKENS") {
            config.llm.max_tokens = Some(tokens.parse().map_err(|_| {
                ConfigError::Invalid(format!("WIREFRAME_LLM_MAX_TOKENS: {tokens}"))
            })?);
        }
        if let Ok(temp) = std::env::var("WIREFRAME_LLM_TEMPERATURE") {
            config.llm.stage_temperature = temp.parse().map_err(|_| {
                ConfigError::Invalid(format!("WIREFRAME_LLM_TEMPERATURE: {temp}"))
            })?;
        }
        if let Ok(retries) = std::env::var("WIREFRAME_LLM_MAX_RETRIES") {
            config.llm.max_retries = retries.parse().map_err(|_| {
                ConfigError::Invalid(format!("WIREFRAME_LLM_MAX_RETRIES: {retries}"))
            })?;
        }
        if let Ok(timeout) = std::env::var("WIREFRAME_LLM_TIMEOUT") {
            config.llm.timeout_seconds = Some(timeout.parse().map_err(|_| {
                ConfigError::Invalid(format!("WIREFRAME_LLM_TIMEOUT: {timeout}"))
            })?);
        }
        if let Ok(enabled) = std::env::var("WIREFRAME_CACHE_ENABLED") {
            config.cache.enabled = enabled.to_lowercase() == "true";
        }
        if let Ok(ttl) = std::env::var("WIREFRAME_CACHE_TTL") {
            config.cache.ttl_seconds = ttl.parse().map_err(|_| {
                ConfigError::Invalid(format!("WIREFRAME_CACHE_TTL: {ttl}"))
            })?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.llm.model.is_empty() {
            errors.push("llm.model must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.llm.stage_temperature) {
            errors.push("llm.stage_temperature must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.llm.conversational_temperature) {
            errors.push("llm.conversational_temperature must be between 0.0 and 1.0".to_string());
        }
        if let Some(tokens) = self.llm.max_tokens {
            if tokens == 0 {
                errors.push("llm.max_tokens must be greater than 0".to_string());
            }
        }
        if self.cache.enabled && self.cache.ttl_seconds == 0 {
            errors.push("cache.ttl_seconds must be greater than 0 when caching is enabled".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
