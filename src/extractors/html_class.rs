use super::{element_text, most_specific, Extractor, ParsingContext};
use crate::error::ExtractError;
use crate::heuristics::{
    has_cooking_verb, has_measurement, is_ingredient_like, is_instruction_like, split_sentences,
    MIN_INSTRUCTION_LEN,
};
use crate::model::Recipe;
use log::debug;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashMap;

/// Texts longer than this are treated as whole-page grabs, not a field.
const MAX_FIELD_TEXT_LEN: usize = 5000;

static LIST_ITEM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static BLOCK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p, span, div").unwrap());
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static NOISE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script, style, noscript, nav, footer, header").unwrap());

/// Class names recognised on popular recipe plugins, with fuzzy fallbacks.
struct ClassMatchers {
    exact: HashMap<&'static str, Vec<&'static str>>,
    fuzzy: HashMap<&'static str, Vec<&'static str>>,
}

impl ClassMatchers {
    fn new() -> Self {
        let mut exact = HashMap::new();
        let mut fuzzy = HashMap::new();

        exact.insert(
            "title",
            vec![
                "wprm-recipe-name",
                "tasty-recipes-title",
                "mv-create-title",
                "recipe-name",
                "recipe-title",
                "recipe-card-title",
                "wpzoom-recipe-card-title",
                "recipe-card__title",
            ],
        );

        exact.insert(
            "description",
            vec![
                "wprm-recipe-summary",
                "tasty-recipes-description",
                "mv-create-description",
                "recipe-summary",
                "recipe-description",
                "recipe-intro",
            ],
        );

        exact.insert(
            "ingredients",
            vec![
                "wprm-recipe-ingredients-container",
                "tasty-recipes-ingredients",
                "mv-create-ingredients",
                "recipe-ingredients",
                "recipe-ingredient-list",
                "recipe-card-ingredients",
                "wpzoom-recipe-ingredients",
                "structured-ingredients",
                "ingredients",
                "ingredient-list",
            ],
        );

        exact.insert(
            "instructions",
            vec![
                "wprm-recipe-instructions-container",
                "tasty-recipes-instructions",
                "mv-create-instructions",
                "recipe-instructions",
                "recipe-instruction-list",
                "recipe-card-instructions",
                "wpzoom-recipe-instructions",
                "structured-instructions",
                "recipe-directions",
                "instructions",
                "directions",
                "method",
            ],
        );

        exact.insert(
            "prep_time",
            vec!["wprm-recipe-prep_time", "tasty-recipes-prep-time", "recipe-prep-time", "prep-time"],
        );

        exact.insert(
            "cook_time",
            vec!["wprm-recipe-cook_time", "tasty-recipes-cook-time", "recipe-cook-time", "cook-time"],
        );

        exact.insert(
            "total_time",
            vec!["wprm-recipe-total_time", "tasty-recipes-total-time", "recipe-total-time", "total-time"],
        );

        exact.insert(
            "servings",
            vec!["wprm-recipe-servings", "tasty-recipes-yield", "recipe-yield", "recipe-servings", "servings"],
        );

        // Fuzzy matchers for fallback
        fuzzy.insert("title", vec!["recipe-title", "recipe-name"]);
        fuzzy.insert("ingredients", vec!["ingredient"]);
        fuzzy.insert("instructions", vec!["instruction", "direction", "method", "step"]);
        fuzzy.insert("description", vec!["summary", "description"]);

        ClassMatchers { exact, fuzzy }
    }

    fn selectors_for(&self, field: &str) -> Vec<Selector> {
        let exact = self
            .exact
            .get(field)
            .into_iter()
            .flatten()
            .map(|class_name| format!(".{class_name}"));
        let fuzzy = self
            .fuzzy
            .get(field)
            .into_iter()
            .flatten()
            .map(|pattern| format!("[class*='{pattern}'], [id*='{pattern}']"));

        exact
            .chain(fuzzy)
            .filter_map(|s| Selector::parse(&s).ok())
            .collect()
    }

    fn find_by_class(&self, document: &Html, field: &str) -> Option<String> {
        for selector in self.selectors_for(field) {
            if let Some(element) = document.select(&selector).next() {
                let text = element_text(&element);
                if !text.is_empty() && text.len() < MAX_FIELD_TEXT_LEN {
                    debug!("Found {} using class selector", field);
                    return Some(text);
                }
            }
        }
        None
    }

    /// List items inside the first matching container, or its blocks when
    /// the container holds no list.
    fn extract_list_items(&self, document: &Html, field: &str) -> Vec<String> {
        for selector in self.selectors_for(field) {
            for container in document.select(&selector) {
                let mut items: Vec<String> = container
                    .select(&LIST_ITEM_SELECTOR)
                    .map(|li| element_text(&li))
                    .filter(|text| !text.is_empty())
                    .collect();

                if items.is_empty() {
                    let blocks = container
                        .select(&BLOCK_SELECTOR)
                        .map(|el| element_text(&el))
                        .filter(|text| text.len() > 5 && text.len() < 500)
                        .collect();
                    items = most_specific(blocks);
                }

                if !items.is_empty() {
                    debug!("Found {} {} using class selector", items.len(), field);
                    return items;
                }
            }
        }
        Vec::new()
    }
}

pub struct HtmlClassExtractor;

impl HtmlClassExtractor {
    /// List items anywhere on the page, split by shape.
    fn scan_list_items(&self, document: &Html) -> (Vec<String>, Vec<String>) {
        let mut ingredients = Vec::new();
        let mut instructions = Vec::new();
        for li in document.select(&LIST_ITEM_SELECTOR) {
            let text = element_text(&li);
            if is_instruction_like(&text) {
                instructions.push(text);
            } else if is_ingredient_like(&text) {
                ingredients.push(text);
            }
        }
        (ingredients, instructions)
    }

    /// Paragraph-level blocks inside containers labelled as instructions.
    fn scan_instruction_containers(&self, matchers: &ClassMatchers, document: &Html) -> Vec<String> {
        let candidates = matchers
            .selectors_for("instructions")
            .iter()
            .flat_map(|selector| document.select(selector).collect::<Vec<_>>())
            .flat_map(|container| container.select(&BLOCK_SELECTOR).collect::<Vec<_>>())
            .map(|el| element_text(&el))
            .filter(|text| is_instruction_like(text))
            .collect();
        most_specific(candidates)
    }

    /// Last resort: every body sentence with a cooking verb and a number or
    /// unit.
    fn mine_sentences(&self, document: &Html) -> Vec<String> {
        let Some(body) = document.select(&BODY_SELECTOR).next() else {
            return Vec::new();
        };

        let noise: Vec<_> = body.select(&NOISE_SELECTOR).map(|el| el.id()).collect();
        let text = body
            .descendants()
            .filter(|node| {
                !node
                    .ancestors()
                    .any(|ancestor| noise.contains(&ancestor.id()))
            })
            .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
            .collect::<Vec<_>>()
            .join(" ");

        let mut sentences: Vec<String> = Vec::new();
        for sentence in split_sentences(&text) {
            let has_number = sentence.chars().any(|c| c.is_ascii_digit());
            if sentence.len() >= MIN_INSTRUCTION_LEN
                && has_cooking_verb(&sentence)
                && (has_number || has_measurement(&sentence))
                && !sentences.contains(&sentence)
            {
                sentences.push(sentence);
            }
        }
        sentences
    }

    fn find_title(&self, matchers: &ClassMatchers, document: &Html) -> String {
        matchers
            .find_by_class(document, "title")
            .or_else(|| {
                document
                    .select(&HEADING_SELECTOR)
                    .map(|el| element_text(&el))
                    .find(|text| !text.is_empty())
            })
            .or_else(|| {
                document
                    .select(&TITLE_SELECTOR)
                    .map(|el| element_text(&el))
                    .find(|text| !text.is_empty())
            })
            .unwrap_or_default()
    }
}

impl Extractor for HtmlClassExtractor {
    fn name(&self) -> &'static str {
        "html_class"
    }

    fn parse(&self, context: &ParsingContext) -> Result<Recipe, ExtractError> {
        let matchers = ClassMatchers::new();
        let document = &context.document;

        let mut ingredients = matchers.extract_list_items(document, "ingredients");
        let mut instructions: Vec<String> = matchers
            .extract_list_items(document, "instructions")
            .into_iter()
            .filter(|step| step.len() > 5)
            .collect();

        if ingredients.is_empty() || instructions.is_empty() {
            let (list_ingredients, list_instructions) = self.scan_list_items(document);
            if ingredients.is_empty() {
                ingredients = list_ingredients;
            }
            if instructions.is_empty() {
                debug!("HtmlClassExtractor: using page-wide list items for instructions");
                instructions = list_instructions;
            }
        }

        if instructions.is_empty() {
            debug!("HtmlClassExtractor: scanning instruction containers");
            instructions = self.scan_instruction_containers(&matchers, document);
        }

        if instructions.is_empty() {
            debug!("HtmlClassExtractor: mining page sentences");
            instructions = self.mine_sentences(document);
        }

        if ingredients.is_empty() && instructions.is_empty() {
            return Err(ExtractError::ParseError(
                "Could not extract recipe content from HTML".into(),
            ));
        }

        debug!(
            "HtmlClassExtractor: {} ingredients, {} instructions",
            ingredients.len(),
            instructions.len()
        );

        Ok(Recipe {
            title: self.find_title(&matchers, document),
            description: matchers.find_by_class(document, "description"),
            prep_time: matchers.find_by_class(document, "prep_time"),
            cook_time: matchers.find_by_class(document, "cook_time"),
            total_time: matchers.find_by_class(document, "total_time"),
            servings: matchers.find_by_class(document, "servings"),
            ingredients: ingredients.into(),
            instructions,
            ..Default::default()
        })
    }
}
