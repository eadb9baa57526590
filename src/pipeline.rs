//! The top-level extraction flow for a single URL.

use crate::builder::RecipePipelineBuilder;
use crate::caption_fallback::CaptionHeuristicFallback;
use crate::error::{Failure, FailureReason};
use crate::extractors::StructuredRecipeExtractor;
use crate::fetchers::{FetchRequest, HttpFetcher, DESKTOP_CHROME};
use crate::generative::GenerativeRecipeExtractor;
use crate::model::{Platform, Recipe};
use crate::providers::CompletionService;
use crate::social::{is_share_url, SocialCaptionScraper};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// What kind of source a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Social(Platform),
    WebPage,
    Invalid,
}

/// Social hosts by domain, any other http(s) URL is a web page.
pub fn classify(url: &str) -> SourceKind {
    let parsed = match url::Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return SourceKind::Invalid,
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return SourceKind::Invalid;
    }
    match parsed.host_str() {
        Some(host) => Platform::from_host(host).map_or(SourceKind::WebPage, SourceKind::Social),
        None => SourceKind::Invalid,
    }
}

/// Carries the collaborators and limits for running extractions.
///
/// Built with [`RecipePipeline::builder`]. A pipeline holds no per-request
/// state, so one value can serve concurrent runs.
pub struct RecipePipeline {
    pub(crate) fetcher: Arc<dyn HttpFetcher>,
    pub(crate) completion: Arc<dyn CompletionService>,
    pub(crate) timeout: Duration,
    pub(crate) fetch_timeout: Duration,
    pub(crate) enhancement_threshold: usize,
    pub(crate) caption_preview_chars: usize,
}

impl RecipePipeline {
    pub fn builder() -> RecipePipelineBuilder {
        RecipePipelineBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extract a recipe from `url`.
    ///
    /// This pipeline:
    /// 1. Classifies the URL as Instagram, Facebook, a web page or invalid
    /// 2. Web pages: fetches the HTML and runs the structured extractors
    /// 3. Social posts: resolves share links, scrapes the caption, asks the
    ///    completion service for a recipe
    /// 4. Falls back to caption heuristics plus generated instructions
    ///
    /// The whole chain races the pipeline timeout. When the budget runs out
    /// the in-flight work is dropped and [`FailureReason::Timeout`] returned.
    pub async fn run(&self, url: &str) -> Result<Recipe, Failure> {
        match tokio::time::timeout(self.timeout, self.extract(url)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Extraction of {} timed out after {:?}", url, self.timeout);
                Err(Failure::new(
                    FailureReason::Timeout,
                    format!("Extraction timed out after {} seconds", self.timeout.as_secs()),
                ))
            }
        }
    }

    async fn extract(&self, url: &str) -> Result<Recipe, Failure> {
        match classify(url) {
            SourceKind::Invalid => Err(Failure::new(
                FailureReason::InvalidUrl,
                format!("Not a valid http(s) URL: {url}"),
            )),
            SourceKind::WebPage => self.extract_web_page(url.trim()).await,
            SourceKind::Social(platform) => self.extract_social(url.trim(), platform).await,
        }
    }

    async fn extract_web_page(&self, url: &str) -> Result<Recipe, Failure> {
        let request = FetchRequest::get(url)
            .profile(&DESKTOP_CHROME)
            .timeout(self.fetch_timeout);
        let response = self.fetcher.fetch(request).await.map_err(|e| {
            Failure::new(FailureReason::FetchFailed, format!("Failed to fetch {url}: {e}"))
        })?;
        if !response.is_success() {
            return Err(Failure::new(
                FailureReason::FetchFailed,
                format!("{url} answered HTTP {}", response.status),
            ));
        }

        StructuredRecipeExtractor::new(self.enhancement_threshold)
            .extract(&response.body)
            .ok_or_else(|| {
                Failure::new(
                    FailureReason::MalformedSource,
                    "Could not parse a recipe from the page",
                )
            })
    }

    async fn extract_social(&self, url: &str, platform: Platform) -> Result<Recipe, Failure> {
        let scraper =
            SocialCaptionScraper::new(self.fetcher.clone()).with_fetch_timeout(self.fetch_timeout);

        let target = if platform == Platform::Facebook && is_share_url(url) {
            scraper.resolve_share_url(url).await.unwrap_or_else(|| {
                debug!("Share link {} not resolved, scraping it as-is", url);
                url.to_string()
            })
        } else {
            url.to_string()
        };

        let scraped = scraper.scrape_platform(&target, platform).await.ok_or_else(|| {
            Failure::new(
                FailureReason::NoCaption,
                format!("Could not extract a caption from the {} post", platform.as_str()),
            )
        })?;

        let no_recipe = || {
            Failure::new(
                FailureReason::NoRecipeFound,
                "No recipe found in the caption",
            )
            .with_caption_preview(&scraped.caption, self.caption_preview_chars)
        };

        let generative = GenerativeRecipeExtractor::new(self.completion.clone());
        if let Some(recipe) = generative.extract(&scraped.caption, Some(url)).await {
            return Ok(attach_source(recipe, url, platform));
        }

        info!("Generative extraction missed, trying caption heuristics");
        let fallback = CaptionHeuristicFallback::new()
            .extract(&scraped.caption, Some(url))
            .ok_or_else(no_recipe)?;
        let recipe = generative
            .generate_instructions(&fallback, Some(&scraped.caption))
            .await
            .ok_or_else(no_recipe)?;
        Ok(attach_source(recipe, url, platform))
    }
}

/// Records the post URL and swaps the image for the platform placeholder.
fn attach_source(mut recipe: Recipe, url: &str, platform: Platform) -> Recipe {
    match platform {
        Platform::Instagram => recipe.instagram_url = Some(url.to_string()),
        Platform::Facebook => recipe.facebook_url = Some(url.to_string()),
    }
    recipe.image = Some(platform.video_image().to_string());
    recipe
}
