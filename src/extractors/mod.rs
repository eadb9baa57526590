//! Structured recipe extraction from web page HTML.

use crate::error::ExtractError;
use crate::heuristics::normalize_whitespace;
use crate::model::{Recipe, UNTITLED_RECIPE};
use log::{debug, info};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

mod enhance;
mod html_class;
mod json_ld;
mod microdata;

pub use enhance::{InstructionEnhancer, DEFAULT_ENHANCEMENT_THRESHOLD};
pub use html_class::HtmlClassExtractor;
pub use json_ld::JsonLdExtractor;
pub use microdata::MicroDataExtractor;

pub(crate) use json_ld::{as_ingredients, as_instructions, as_text};

static PAGE_TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, title").unwrap());

pub struct ParsingContext {
    pub document: Html,
}

impl ParsingContext {
    pub fn new(html: &str) -> Self {
        ParsingContext {
            document: Html::parse_document(html),
        }
    }
}

/// One strategy of the extraction cascade. An `Err` is a soft miss.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, context: &ParsingContext) -> Result<Recipe, ExtractError>;
}

/// Runs the extractor cascade (JSON-LD, microdata, heuristic DOM scan)
/// and the instruction enhancement pass over a page.
pub struct StructuredRecipeExtractor {
    extractors: Vec<Box<dyn Extractor>>,
    enhancer: InstructionEnhancer,
}

impl Default for StructuredRecipeExtractor {
    fn default() -> Self {
        StructuredRecipeExtractor::new(DEFAULT_ENHANCEMENT_THRESHOLD)
    }
}

impl StructuredRecipeExtractor {
    pub fn new(enhancement_threshold: usize) -> Self {
        StructuredRecipeExtractor {
            extractors: vec![
                Box::new(JsonLdExtractor),
                Box::new(MicroDataExtractor),
                Box::new(HtmlClassExtractor),
            ],
            enhancer: InstructionEnhancer::new(enhancement_threshold),
        }
    }

    /// Returns `None` when no strategy recovered any title, ingredient or
    /// instruction. A `None` means give up on this source.
    pub fn extract(&self, html: &str) -> Option<Recipe> {
        let context = ParsingContext::new(html);

        let mut recipe = self.extractors.iter().find_map(|extractor| {
            match extractor.parse(&context) {
                Ok(recipe) => {
                    info!("Extracted recipe using {} extractor", extractor.name());
                    Some(recipe)
                }
                Err(e) => {
                    debug!("{} extractor missed: {}", extractor.name(), e);
                    None
                }
            }
        })?;

        self.enhancer.enhance(&context.document, &mut recipe);

        if !recipe.has_content() {
            return None;
        }

        if recipe.title.trim().is_empty() {
            recipe.title = page_title(&context.document).unwrap_or_else(|| UNTITLED_RECIPE.to_string());
        }

        Some(recipe)
    }
}

fn page_title(document: &Html) -> Option<String> {
    document
        .select(&PAGE_TITLE_SELECTOR)
        .map(|el| element_text(&el))
        .find(|text| !text.is_empty())
}

/// All text inside an element with whitespace collapsed.
pub(crate) fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Drops exact repeats and any candidate that contains another candidate,
/// so wrapper elements lose to the elements they wrap. Order is kept.
pub(crate) fn most_specific(candidates: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }

    unique
        .iter()
        .filter(|candidate| {
            !unique
                .iter()
                .any(|other| other != *candidate && candidate.contains(other.as_str()))
        })
        .cloned()
        .collect()
}
