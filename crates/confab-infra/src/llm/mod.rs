//! LLM provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`LlmProvider`]
//! trait defined in `confab-core`, plus a factory ([`create_provider`])
//! that builds it from a [`ProviderConfig`].
//!
//! [`LlmProvider`]: confab_core::llm::provider::LlmProvider

pub mod openai_compat;

use secrecy::SecretString;

use confab_core::llm::box_provider::BoxLlmProvider;
use confab_types::config::ProviderConfig;
use confab_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;

/// Create a [`BoxLlmProvider`] from a [`ProviderConfig`].
///
/// A configured `base_url` always wins. Otherwise the provider name selects
/// the well-known endpoint; unknown names without a base URL are rejected.
///
/// # Errors
///
/// `AuthenticationFailed` when no API key is available, `InvalidRequest`
/// for an unknown provider without a base URL.
pub fn create_provider(
    config: &ProviderConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;

    let provider = match config.base_url.as_deref() {
        Some(base_url) => {
            OpenAiCompatibleProvider::new(openai_compat::config::custom(&config.name, base_url, key))
        }
        None => match config.name.as_str() {
            "groq" => OpenAiCompatibleProvider::groq(key),
            "openai" => OpenAiCompatibleProvider::openai(key),
            other => {
                return Err(LlmError::InvalidRequest(format!(
                    "unknown provider '{other}'; set provider.base_url in config.toml"
                )));
            }
        },
    };

    tracing::debug!(provider = %config.name, "Generation provider configured");
    Ok(BoxLlmProvider::new(provider))
}
