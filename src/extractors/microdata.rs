use super::json_ld::convert_duration;
use super::{element_text, most_specific, Extractor, ParsingContext};
use crate::error::ExtractError;
use crate::heuristics::is_instruction_like;
use crate::model::{Nutrition, Recipe};
use log::debug;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static ITEMSCOPE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[itemtype]").unwrap());

static STEP_CANDIDATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li, p, div, span").unwrap());

pub struct MicroDataExtractor;

impl MicroDataExtractor {
    fn find_recipe_container<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&ITEMSCOPE_SELECTOR).find(|element| {
            element
                .value()
                .attr("itemtype")
                .is_some_and(|itemtype| itemtype.contains("Recipe"))
        })
    }

    fn itemprop_elements<'a>(&self, root: ElementRef<'a>, prop: &str) -> Vec<ElementRef<'a>> {
        match Selector::parse(&format!("[itemprop~='{prop}']")) {
            Ok(selector) => root.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Text of the first matching itemprop, preferring a `content` attribute.
    fn get_itemprop(&self, root: ElementRef, prop: &str) -> Option<String> {
        self.itemprop_elements(root, prop).into_iter().find_map(|el| {
            let value = el
                .value()
                .attr("content")
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| element_text(&el));
            (!value.is_empty()).then_some(value)
        })
    }

    fn get_itemprop_list(&self, root: ElementRef, prop: &str) -> Vec<String> {
        self.itemprop_elements(root, prop)
            .iter()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// Times carry the ISO value in `datetime` (or `content`), with display
    /// text as the fallback.
    fn get_time(&self, root: ElementRef, prop: &str) -> Option<String> {
        let element = self.itemprop_elements(root, prop).into_iter().next()?;
        let attr = element
            .value()
            .attr("datetime")
            .or_else(|| element.value().attr("content"));
        match attr {
            Some(iso) if !iso.trim().is_empty() => Some(convert_duration(iso)),
            _ => {
                let text = element_text(&element);
                (!text.is_empty()).then_some(text)
            }
        }
    }

    fn get_image(&self, root: ElementRef) -> Option<String> {
        let element = self.itemprop_elements(root, "image").into_iter().next()?;
        let value = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("content"))
            .or_else(|| element.value().attr("href"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| element_text(&element));
        (!value.is_empty()).then_some(value)
    }

    fn get_author(&self, root: ElementRef) -> Option<String> {
        let author = self.itemprop_elements(root, "author").into_iter().next()?;
        // Prefer a nested Person name over the whole author block
        let text = self
            .get_itemprop(author, "name")
            .unwrap_or_else(|| element_text(&author));
        (!text.is_empty()).then_some(text)
    }

    /// Instruction-shaped text from the container's own elements, used when
    /// the page marks up no instruction itemprop.
    fn scan_instruction_candidates(&self, root: ElementRef) -> Vec<String> {
        let candidates = root
            .select(&STEP_CANDIDATE_SELECTOR)
            .map(|element| element_text(&element))
            .filter(|text| is_instruction_like(text))
            .collect();
        most_specific(candidates)
    }
}

impl Extractor for MicroDataExtractor {
    fn name(&self) -> &'static str {
        "microdata"
    }

    fn parse(&self, context: &ParsingContext) -> Result<Recipe, ExtractError> {
        // We strictly enforce finding a Recipe container to avoid false positives.
        // Global searches for 'itemprop' often pick up unrelated page content.
        let container = self
            .find_recipe_container(&context.document)
            .ok_or_else(|| ExtractError::ParseError("No MicroData Recipe container found".into()))?;

        let mut ingredients = self.get_itemprop_list(container, "recipeIngredient");
        if ingredients.is_empty() {
            ingredients = self.get_itemprop_list(container, "ingredients");
        }

        let mut instructions = self.get_itemprop_list(container, "recipeInstructions");
        if instructions.is_empty() {
            instructions = self.get_itemprop_list(container, "instructions");
        }
        if instructions.is_empty() {
            debug!("MicroDataExtractor: no instruction itemprop, scanning child elements");
            instructions = self.scan_instruction_candidates(container);
        }

        if ingredients.is_empty() && instructions.is_empty() {
            return Err(ExtractError::ParseError(
                "Could not extract recipe content".into(),
            ));
        }

        Ok(Recipe {
            title: self.get_itemprop(container, "name").unwrap_or_default(),
            description: self.get_itemprop(container, "description"),
            image: self.get_image(container),
            prep_time: self.get_time(container, "prepTime"),
            cook_time: self.get_time(container, "cookTime"),
            total_time: self.get_time(container, "totalTime"),
            servings: self.get_itemprop(container, "recipeYield"),
            ingredients: ingredients.into(),
            instructions,
            nutrition: Nutrition {
                calories: self.get_itemprop(container, "calories"),
                protein: self.get_itemprop(container, "proteinContent"),
                carbs: self.get_itemprop(container, "carbohydrateContent"),
                fat: self.get_itemprop(container, "fatContent"),
            },
            author: self.get_author(container),
            rating: self.get_itemprop(container, "ratingValue"),
            review_count: self
                .get_itemprop(container, "reviewCount")
                .or_else(|| self.get_itemprop(container, "ratingCount")),
            ..Default::default()
        })
    }
}
