use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::fetchers::{HttpFetcher, ReqwestFetcher};
use crate::pipeline::RecipePipeline;
use crate::providers::{CompletionService, FallbackProvider};

/// Builder for configuring a [`RecipePipeline`]
///
/// Unset values come from [`ExtractConfig`] (its defaults, or the
/// configuration passed to [`RecipePipelineBuilder::config`]).
#[derive(Default)]
pub struct RecipePipelineBuilder {
    config: Option<ExtractConfig>,
    fetcher: Option<Arc<dyn HttpFetcher>>,
    completion: Option<Arc<dyn CompletionService>>,
    timeout: Option<Duration>,
    fetch_timeout: Option<Duration>,
    enhancement_threshold: Option<usize>,
    caption_preview_chars: Option<usize>,
}

impl RecipePipelineBuilder {
    /// Use a loaded configuration for every value not set explicitly
    ///
    /// # Example
    /// ```
    /// use recipe_extract::{ExtractConfig, RecipePipeline};
    ///
    /// let config = ExtractConfig::default();
    /// let builder = RecipePipeline::builder().config(&config);
    /// ```
    pub fn config(mut self, config: &ExtractConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    /// Set the HTTP fetcher. Defaults to a [`ReqwestFetcher`].
    pub fn fetcher(mut self, fetcher: Arc<dyn HttpFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set the completion service used for generative extraction
    ///
    /// Without one, the builder creates providers from configuration.
    pub fn completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Set the wall-clock budget for a whole run
    ///
    /// # Example
    /// ```
    /// use recipe_extract::RecipePipeline;
    /// use std::time::Duration;
    ///
    /// let builder = RecipePipeline::builder().timeout(Duration::from_secs(30));
    /// ```
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set the timeout of each individual HTTP fetch
    pub fn fetch_timeout(mut self, duration: Duration) -> Self {
        self.fetch_timeout = Some(duration);
        self
    }

    /// Set the instruction count at or below which web page instructions are
    /// re-scanned from the page text
    pub fn enhancement_threshold(mut self, threshold: usize) -> Self {
        self.enhancement_threshold = Some(threshold);
        self
    }

    /// Set how much of the caption a `no_recipe_found` failure carries
    pub fn caption_preview_chars(mut self, chars: usize) -> Self {
        self.caption_preview_chars = Some(chars);
        self
    }

    /// Build the pipeline
    ///
    /// # Errors
    /// Returns `ExtractError` if:
    /// - No completion service was given and none can be created from
    ///   configuration (`BuilderError`)
    /// - The default HTTP client cannot be created
    ///
    /// # Example
    /// ```no_run
    /// # use recipe_extract::RecipePipeline;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let pipeline = RecipePipeline::builder().build()?;
    /// let recipe = pipeline.run("https://www.instagram.com/reel/ABC123/").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<RecipePipeline, ExtractError> {
        let config = self.config.unwrap_or_default();

        let completion = match self.completion {
            Some(completion) => completion,
            None => Arc::new(FallbackProvider::new(&config)?),
        };

        let fetcher: Arc<dyn HttpFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(ReqwestFetcher::new()?),
        };

        let pipeline = RecipePipeline {
            fetcher,
            completion,
            timeout: self.timeout.unwrap_or_else(|| config.pipeline.timeout()),
            fetch_timeout: self
                .fetch_timeout
                .unwrap_or_else(|| config.pipeline.fetch_timeout()),
            enhancement_threshold: self
                .enhancement_threshold
                .unwrap_or(config.pipeline.enhancement_threshold),
            caption_preview_chars: self
                .caption_preview_chars
                .unwrap_or(config.pipeline.caption_preview_chars),
        };
        debug!(
            "Built pipeline: timeout {:?}, fetch timeout {:?}, enhancement threshold {}",
            pipeline.timeout, pipeline.fetch_timeout, pipeline.enhancement_threshold
        );
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::mock::MockFetcher;
    use crate::providers::OpenAIProvider;

    fn completion() -> Arc<dyn CompletionService> {
        Arc::new(OpenAIProvider::with_api_key("test-key".to_string(), "gpt-4o-mini".to_string()))
    }

    #[test]
    fn test_defaults_from_config() {
        let pipeline = RecipePipeline::builder()
            .fetcher(Arc::new(MockFetcher::new()))
            .completion(completion())
            .build()
            .unwrap();

        assert_eq!(pipeline.timeout, Duration::from_secs(45));
        assert_eq!(pipeline.fetch_timeout, Duration::from_secs(10));
        assert_eq!(pipeline.enhancement_threshold, 8);
        assert_eq!(pipeline.caption_preview_chars, 500);
    }

    #[test]
    fn test_explicit_values_override_config() {
        let mut config = ExtractConfig::default();
        config.pipeline.timeout_secs = 20;
        config.pipeline.enhancement_threshold = 3;

        let pipeline = RecipePipeline::builder()
            .config(&config)
            .fetcher(Arc::new(MockFetcher::new()))
            .completion(completion())
            .timeout(Duration::from_secs(5))
            .caption_preview_chars(100)
            .build()
            .unwrap();

        assert_eq!(pipeline.timeout(), Duration::from_secs(5));
        assert_eq!(pipeline.enhancement_threshold, 3);
        assert_eq!(pipeline.caption_preview_chars, 100);
    }

    #[test]
    fn test_missing_completion_service_is_builder_error() {
        let mut config = ExtractConfig::default();
        config.default_provider = "nonexistent".to_string();
        config.fallback.enabled = false;

        let result = RecipePipeline::builder()
            .config(&config)
            .fetcher(Arc::new(MockFetcher::new()))
            .build();
        assert!(matches!(result, Err(ExtractError::BuilderError(_))));
    }
}
