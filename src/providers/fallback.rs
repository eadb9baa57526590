use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::providers::{CompletionService, ProviderFactory};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::sleep;

/// Tries each configured provider in order, retrying each with a
/// linearly growing delay before moving to the next.
pub struct FallbackProvider {
    providers: Vec<Box<dyn CompletionService>>,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

impl FallbackProvider {
    /// Create a new fallback provider from configuration
    pub fn new(config: &ExtractConfig) -> Result<Self, ExtractError> {
        if !config.fallback.enabled {
            let default_provider = ProviderFactory::get_default_provider(config)?;
            return Ok(FallbackProvider {
                providers: vec![default_provider],
                retry_attempts: 1,
                retry_delay_ms: 0,
            });
        }

        let mut providers = Vec::new();

        for provider_name in &config.fallback.order {
            let Some(provider_config) = config.providers.get(provider_name) else {
                warn!(
                    "Provider '{}' in fallback order not found in configuration",
                    provider_name
                );
                continue;
            };
            if !provider_config.enabled {
                continue;
            }
            match ProviderFactory::create(provider_name, provider_config) {
                Ok(provider) => {
                    info!("Added '{}' to fallback chain", provider_name);
                    providers.push(provider);
                }
                Err(e) => {
                    warn!("Failed to initialize provider '{}': {}", provider_name, e);
                }
            }
        }

        Self::from_providers(
            providers,
            config.fallback.retry_attempts,
            config.fallback.retry_delay_ms,
        )
    }

    /// Chain already-built services, e.g. custom implementations.
    pub fn from_providers(
        providers: Vec<Box<dyn CompletionService>>,
        retry_attempts: u32,
        retry_delay_ms: u64,
    ) -> Result<Self, ExtractError> {
        if providers.is_empty() {
            return Err(ExtractError::BuilderError(
                "No providers available in fallback configuration".into(),
            ));
        }
        Ok(FallbackProvider {
            providers,
            retry_attempts: retry_attempts.max(1),
            retry_delay_ms,
        })
    }

    async fn try_provider_with_retry(
        &self,
        provider: &dyn CompletionService,
        prompt: &str,
    ) -> Result<String, ExtractError> {
        let mut attempt = 1;
        loop {
            debug!(
                "Attempting completion with {} (attempt {}/{})",
                provider.provider_name(),
                attempt,
                self.retry_attempts
            );

            match provider.complete(prompt).await {
                Ok(result) => {
                    info!("Completion succeeded using {}", provider.provider_name());
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        "Provider {} failed (attempt {}/{}): {}",
                        provider.provider_name(),
                        attempt,
                        self.retry_attempts,
                        e
                    );
                    if attempt >= self.retry_attempts {
                        return Err(e);
                    }
                }
            }

            let delay = Duration::from_millis(self.retry_delay_ms * attempt as u64);
            debug!("Waiting {:?} before retry", delay);
            sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl CompletionService for FallbackProvider {
    fn provider_name(&self) -> &str {
        "fallback"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ExtractError> {
        let mut all_errors: Vec<String> = Vec::new();

        for provider in &self.providers {
            match self.try_provider_with_retry(provider.as_ref(), prompt).await {
                Ok(result) => return Ok(result),
                Err(e) => all_errors.push(format!("{}: {}", provider.provider_name(), e)),
            }
        }

        Err(ExtractError::CompletionError(format!(
            "All providers failed:\n{}",
            all_errors.join("\n")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FallbackConfig, ProviderConfig};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Flaky {
        name: &'static str,
        failures_left: AtomicU32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl CompletionService for Flaky {
        fn provider_name(&self) -> &str {
            self.name
        }

        async fn complete(&self, _prompt: &str) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(ExtractError::CompletionError("overloaded".into()));
            }
            Ok(format!("answer from {}", self.name))
        }
    }

    fn flaky(name: &'static str, failures: u32) -> (Box<dyn CompletionService>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = Flaky {
            name,
            failures_left: AtomicU32::new(failures),
            calls: calls.clone(),
        };
        (Box::new(provider), calls)
    }

    fn config_with(order: Vec<&str>) -> ExtractConfig {
        let mut providers = HashMap::new();
        for name in ["openai", "anthropic"] {
            providers.insert(
                name.to_string(),
                ProviderConfig {
                    api_key: Some("test-key".to_string()),
                    ..ProviderConfig::new("test-model")
                },
            );
        }
        ExtractConfig {
            providers,
            fallback: FallbackConfig {
                enabled: true,
                order: order.into_iter().map(String::from).collect(),
                retry_attempts: 2,
                retry_delay_ms: 10,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_fallback_multiple_providers() {
        let fallback = FallbackProvider::new(&config_with(vec!["openai", "anthropic"])).unwrap();
        assert_eq!(fallback.providers.len(), 2);
        assert_eq!(fallback.provider_name(), "fallback");
    }

    #[test]
    fn test_fallback_disabled_uses_default_provider() {
        let mut config = config_with(vec!["openai", "anthropic"]);
        config.fallback.enabled = false;

        let fallback = FallbackProvider::new(&config).unwrap();
        assert_eq!(fallback.providers.len(), 1);
        assert_eq!(fallback.retry_attempts, 1);
    }

    #[test]
    fn test_fallback_no_providers() {
        let result = FallbackProvider::new(&config_with(vec!["missing"]));
        match result {
            Err(e) => assert!(e.to_string().contains("No providers available")),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let (provider, calls) = flaky("first", 1);
        let fallback = FallbackProvider::from_providers(vec![provider], 3, 100).unwrap();

        let result = fallback.complete("prompt").await.unwrap();
        assert_eq!(result, "answer from first");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_moves_to_next_provider() {
        let (first, first_calls) = flaky("first", 10);
        let (second, second_calls) = flaky("second", 0);
        let fallback = FallbackProvider::from_providers(vec![first, second], 2, 100).unwrap();

        let result = fallback.complete("prompt").await.unwrap();
        assert_eq!(result, "answer from second");
        assert_eq!(first_calls.load(Ordering::SeqCst), 2);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_providers_fail() {
        let (first, _) = flaky("first", 10);
        let (second, _) = flaky("second", 10);
        let fallback = FallbackProvider::from_providers(vec![first, second], 1, 0).unwrap();

        let err = fallback.complete("prompt").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("All providers failed"));
        assert!(message.contains("first"));
        assert!(message.contains("second"));
    }
}
