use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors raised inside the extraction core.
///
/// Strategy steps convert most of these into soft misses; only the
/// pipeline turns them into a user-facing [`Failure`].
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Failed to fetch a URL
    #[error("Failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),

    /// Server answered with a status the caller can't use
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Failed to parse recipe from the source
    #[error("Failed to parse recipe: {0}")]
    ParseError(String),

    /// The completion service failed or returned nothing usable
    #[error("Completion failed: {0}")]
    CompletionError(String),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    BuilderError(String),

    /// Error parsing HTTP headers
    #[error("Header parse error: {0}")]
    HeaderError(#[from] reqwest::header::InvalidHeaderValue),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    /// A single request ran past its own timeout
    #[error("Request timed out")]
    Timeout,

    /// The pipeline ran and gave up on the source
    #[error("Extraction failed: {0}")]
    Failed(#[from] Failure),
}

/// Why the pipeline gave up on a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidUrl,
    FetchFailed,
    NoCaption,
    NoRecipeFound,
    Timeout,
    MalformedSource,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidUrl => "invalid_url",
            FailureReason::FetchFailed => "fetch_failed",
            FailureReason::NoCaption => "no_caption",
            FailureReason::NoRecipeFound => "no_recipe_found",
            FailureReason::Timeout => "timeout",
            FailureReason::MalformedSource => "malformed_source",
        }
    }

    /// Transient reasons a caller may retry with backoff.
    /// A clean negative result should not be retried blindly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureReason::Timeout | FailureReason::FetchFailed)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal pipeline failure handed to the surrounding application.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{reason}: {message}")]
pub struct Failure {
    pub reason: FailureReason,
    pub message: String,
    /// Truncated caption, offered to the user for manual entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_preview: Option<String>,
}

impl Failure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Failure {
            reason,
            message: message.into(),
            caption_preview: None,
        }
    }

    /// Attaches at most `max_chars` characters of the caption.
    pub fn with_caption_preview(mut self, caption: &str, max_chars: usize) -> Self {
        let preview: String = caption.trim().chars().take(max_chars).collect();
        if !preview.is_empty() {
            self.caption_preview = Some(preview);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_and_serialization() {
        let failure = Failure::new(FailureReason::NoRecipeFound, "no recipe found")
            .with_caption_preview("  Crispy chicken thighs with garlic  ", 14);

        assert_eq!(failure.to_string(), "no_recipe_found: no recipe found");
        assert_eq!(failure.caption_preview.as_deref(), Some("Crispy chicken"));

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["reason"], "no_recipe_found");
        assert_eq!(json["captionPreview"], "Crispy chicken");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let failure = Failure::new(FailureReason::NoRecipeFound, "x")
            .with_caption_preview("crème brûlée", 4);
        assert_eq!(failure.caption_preview.as_deref(), Some("crèm"));
    }

    #[test]
    fn test_empty_caption_gives_no_preview() {
        let failure = Failure::new(FailureReason::NoCaption, "x").with_caption_preview("   ", 10);
        assert!(failure.caption_preview.is_none());
    }

    #[test]
    fn test_retryable_reasons() {
        assert!(FailureReason::Timeout.is_retryable());
        assert!(FailureReason::FetchFailed.is_retryable());
        assert!(!FailureReason::NoRecipeFound.is_retryable());
        assert!(!FailureReason::InvalidUrl.is_retryable());
    }
}
