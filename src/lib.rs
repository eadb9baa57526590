//! Recipe extraction from recipe web pages and Instagram/Facebook posts.
//!
//! [`run_extraction_pipeline`] is the one call most applications need. The
//! other entry points expose the individual stages so they can be driven
//! with custom collaborators.

pub mod builder;
pub mod caption_fallback;
pub mod config;
pub mod entities;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod generative;
pub mod heuristics;
pub mod model;
pub mod pipeline;
pub mod providers;
pub mod social;

use std::sync::Arc;

use log::debug;

pub use builder::RecipePipelineBuilder;
pub use caption_fallback::CaptionHeuristicFallback;
pub use config::ExtractConfig;
pub use entities::decode_entities;
pub use error::{ExtractError, Failure, FailureReason};
pub use extractors::StructuredRecipeExtractor;
pub use fetchers::{FetchRequest, FetchResponse, HttpFetcher, ReqwestFetcher};
pub use generative::GenerativeRecipeExtractor;
pub use model::{Ingredients, Nutrition, Platform, Recipe};
pub use pipeline::{classify, RecipePipeline, SourceKind};
pub use providers::CompletionService;
pub use social::{SocialCaption, SocialCaptionScraper};

/// Extract a recipe from a web page's HTML.
///
/// # Returns
/// * `Ok(Recipe)` - From JSON-LD, microdata or the heuristic DOM scan
/// * `Err(Failure)` - `malformed_source` when the page holds no recipe
pub fn extract_recipe_from_html(html: &str) -> Result<Recipe, Failure> {
    StructuredRecipeExtractor::default()
        .extract(html)
        .ok_or_else(|| {
            Failure::new(
                FailureReason::MalformedSource,
                "Could not parse a recipe from the page",
            )
        })
}

/// Scrape the caption (and image, when present) of an Instagram or
/// Facebook post.
pub async fn scrape_social_caption(
    fetcher: Arc<dyn HttpFetcher>,
    url: &str,
) -> Result<SocialCaption, Failure> {
    let platform = match classify(url) {
        SourceKind::Social(platform) => platform,
        _ => {
            return Err(Failure::new(
                FailureReason::InvalidUrl,
                format!("Not an Instagram or Facebook URL: {url}"),
            ))
        }
    };

    let scraper = SocialCaptionScraper::new(fetcher);
    let target = match platform {
        Platform::Facebook if social::is_share_url(url) => scraper
            .resolve_share_url(url)
            .await
            .unwrap_or_else(|| url.to_string()),
        _ => url.to_string(),
    };
    scraper
        .scrape_platform(&target, platform)
        .await
        .ok_or_else(|| Failure::new(FailureReason::NoCaption, "Could not extract a caption"))
}

/// Ask the completion service for a recipe in `caption`.
pub async fn extract_recipe_from_caption(
    completion: Arc<dyn CompletionService>,
    caption: &str,
    source_url: &str,
) -> Result<Recipe, Failure> {
    GenerativeRecipeExtractor::new(completion)
        .extract(caption, Some(source_url))
        .await
        .ok_or_else(|| {
            Failure::new(FailureReason::NoRecipeFound, "No recipe found in the caption")
                .with_caption_preview(caption, ExtractConfig::default().pipeline.caption_preview_chars)
        })
}

/// Write instructions for an ingredients-only recipe.
///
/// The returned recipe has `metadata.instructionsGenerated` set.
pub async fn generate_instructions(
    completion: Arc<dyn CompletionService>,
    recipe: &Recipe,
    caption: &str,
) -> Result<Recipe, Failure> {
    GenerativeRecipeExtractor::new(completion)
        .generate_instructions(recipe, Some(caption))
        .await
        .ok_or_else(|| {
            Failure::new(
                FailureReason::NoRecipeFound,
                format!("Could not generate instructions for '{}'", recipe.title),
            )
        })
}

/// Run the whole extraction for `url` with configuration from
/// `config.toml` and `RECIPE__*` environment variables.
///
/// # Errors
/// * `ExtractError::Failed` - The pipeline gave up; the [`Failure`] carries
///   the reason
/// * Configuration or provider setup errors
///
/// # Example
/// ```no_run
/// # use recipe_extract::{run_extraction_pipeline, ExtractError};
/// # #[tokio::main]
/// # async fn main() {
/// match run_extraction_pipeline("https://www.instagram.com/reel/ABC123/").await {
///     Ok(recipe) => println!("{}", recipe.title),
///     Err(ExtractError::Failed(failure)) if failure.reason.is_retryable() => { /* retry later */ }
///     Err(e) => eprintln!("{e}"),
/// }
/// # }
/// ```
pub async fn run_extraction_pipeline(url: &str) -> Result<Recipe, ExtractError> {
    let config = ExtractConfig::load()?;
    debug!("Loaded configuration, default provider '{}'", config.default_provider);
    let pipeline = RecipePipeline::builder().config(&config).build()?;
    Ok(pipeline.run(url).await?)
}
