//! Configuration types for Confab.
//!
//! `ChatConfig` represents the top-level `config.toml` that controls the
//! generation provider, the model catalog, and sampling settings.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.confab/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model used when a caller does not pick one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Models callers may select. An empty list disables the check.
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Sampling temperature sent with every generation request.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum output tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on a single generation call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_models() -> Vec<String> {
    vec![
        "llama-3.3-70b-versatile".to_string(),
        "mixtral-8x7b-32768".to_string(),
    ]
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            models: default_models(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            provider: ProviderConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Whether `model` may be selected by callers.
    pub fn is_known_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }
}

/// Connection settings for the OpenAI-compatible generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name ("groq", "openai", or anything with a `base_url`).
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Override the provider's default base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_provider_name() -> String {
    "groq".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}
