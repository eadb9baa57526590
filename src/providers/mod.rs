//! Text-completion services used by the generative extractor.

mod anthropic;
mod factory;
mod fallback;
mod google;
mod open_ai;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use fallback::FallbackProvider;
pub use google::GoogleProvider;
pub use open_ai::OpenAIProvider;

use crate::error::ExtractError;
use async_trait::async_trait;
use serde_json::Value;

/// System message sent with every completion request.
pub(crate) const SYSTEM_PROMPT: &str =
    "You extract cooking recipes from social media text. Reply with exactly the JSON requested and nothing else.";

/// Unified trait for all completion providers. The returned text carries
/// no structure guarantee.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, ExtractError>;
}

/// Checks the status then reads the JSON body of a provider response.
pub(crate) async fn response_json(
    provider: &str,
    response: reqwest::Response,
) -> Result<Value, ExtractError> {
    let status = response.status();
    if !status.is_success() {
        let url = response.url().to_string();
        log::debug!("{} answered HTTP {}", provider, status);
        return Err(ExtractError::HttpStatus {
            status: status.as_u16(),
            url,
        });
    }
    Ok(response.json().await?)
}

/// Reads a text field of a provider response, rejecting blanks.
pub(crate) fn text_at(provider: &str, value: &Value) -> Result<String, ExtractError> {
    value
        .as_str()
        .map(str::to_string)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            ExtractError::CompletionError(format!("Failed to extract content from {} response", provider))
        })
}
