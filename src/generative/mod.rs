//! Recipe extraction from free-text captions via a completion service.

mod prompt;
mod repair;

pub use prompt::{
    build_instructions_prompt, build_recipe_prompt, INSTRUCTION_GENERATION_PROMPT,
    RECIPE_EXTRACTION_PROMPT,
};
pub use repair::{isolate, manual_extract, parse_array, parse_object, repair_json, strip_code_fences};

use crate::extractors::{as_ingredients, as_instructions, as_text};
use crate::model::{Nutrition, Platform, Recipe};
use crate::providers::CompletionService;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Bounds on the number of generated steps that are kept.
pub const MIN_GENERATED_STEPS: usize = 4;
pub const MAX_GENERATED_STEPS: usize = 8;

pub struct GenerativeRecipeExtractor {
    completion: Arc<dyn CompletionService>,
}

impl GenerativeRecipeExtractor {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        GenerativeRecipeExtractor { completion }
    }

    /// Asks the completion service for a recipe and narrows whatever comes
    /// back. `None` when the service fails or no title is recoverable.
    pub async fn extract(&self, caption: &str, source_url: Option<&str>) -> Option<Recipe> {
        let prompt = build_recipe_prompt(caption, source_url);
        let completion = match self.completion.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} completion failed: {}", self.completion.provider_name(), e);
                return None;
            }
        };

        let platform = source_url.and_then(platform_of);
        let recipe = parse_recipe_completion(&completion, platform);
        match &recipe {
            Some(recipe) => info!(
                "Generated recipe '{}' with {} ingredients",
                recipe.title,
                recipe.ingredients.len()
            ),
            None => debug!("Completion held no usable recipe"),
        }
        recipe
    }

    /// Writes steps for an ingredients-only recipe. The returned copy is
    /// flagged as having generated instructions; `None` leaves the caller's
    /// recipe as it was.
    pub async fn generate_instructions(&self, recipe: &Recipe, caption: Option<&str>) -> Option<Recipe> {
        let prompt = build_instructions_prompt(recipe, caption);
        let completion = match self.completion.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} instruction generation failed: {}", self.completion.provider_name(), e);
                return None;
            }
        };

        let steps = parse_generated_steps(&completion)?;
        info!("Generated {} instructions for '{}'", steps.len(), recipe.title);

        let mut generated = recipe.clone();
        generated.instructions = steps;
        generated.mark_instructions_generated();
        Some(generated)
    }
}

fn platform_of(url: &str) -> Option<Platform> {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().and_then(Platform::from_host))
}

/// Turns raw completion text into a recipe: parse (with repair), else
/// recover fields one by one with regexes.
pub fn parse_recipe_completion(completion: &str, platform: Option<Platform>) -> Option<Recipe> {
    let fields = parse_object(completion).or_else(|| {
        debug!("Completion is not parseable JSON, falling back to field extraction");
        manual_extract(&strip_code_fences(completion))
    })?;
    recipe_from_fields(&fields, platform)
}

/// Narrows a generated JSON object into a recipe. Requires a title.
pub fn recipe_from_fields(fields: &Map<String, Value>, platform: Option<Platform>) -> Option<Recipe> {
    let text = |key: &str| fields.get(key).and_then(as_text);
    let title = text("title")?;

    let mut recipe = Recipe {
        title,
        description: text("description"),
        image: platform.map(|p| p.video_image().to_string()),
        prep_time: text("prepTime"),
        cook_time: text("cookTime"),
        total_time: text("totalTime"),
        servings: text("servings"),
        difficulty: text("difficulty"),
        ingredients: fields
            .get("ingredients")
            .map(as_ingredients)
            .unwrap_or_default(),
        instructions: fields.get("instructions").map(as_instructions).unwrap_or_default(),
        nutrition: Nutrition {
            calories: text("calories"),
            protein: text("protein"),
            carbs: text("carbs"),
            fat: text("fat"),
        },
        ..Default::default()
    };
    if !recipe.instructions.is_empty() {
        recipe.mark_instructions_generated();
    }
    Some(recipe)
}

/// A JSON array of step strings, capped at [`MAX_GENERATED_STEPS`]. Fewer
/// than [`MIN_GENERATED_STEPS`] usable steps is a miss.
pub fn parse_generated_steps(completion: &str) -> Option<Vec<String>> {
    let items = parse_array(completion)?;
    let steps: Vec<String> = items
        .iter()
        .flat_map(|item| as_instructions(item))
        .take(MAX_GENERATED_STEPS)
        .collect();
    (steps.len() >= MIN_GENERATED_STEPS).then_some(steps)
}
