use super::{element_text, most_specific};
use crate::heuristics::{has_continuation_cue, is_footnote, is_instruction_like, looks_like_section_heading};
use crate::model::Recipe;
use log::{debug, info};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Default instruction count at or below which the span scan may replace
/// the extracted steps.
pub const DEFAULT_ENHANCEMENT_THRESHOLD: usize = 8;

const INSTRUCTION_HEADINGS: &[&str] = &["instructions", "directions", "method", "preparation"];

static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, strong, b").unwrap());
static SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());

/// Post-processing applied to whichever strategy produced the recipe.
///
/// Some sites ship short or fragmentary schema steps while the rendered
/// page holds the full text in spans under an "Instructions" heading.
#[derive(Debug, Clone)]
pub struct InstructionEnhancer {
    threshold: usize,
}

impl Default for InstructionEnhancer {
    fn default() -> Self {
        InstructionEnhancer::new(DEFAULT_ENHANCEMENT_THRESHOLD)
    }
}

impl InstructionEnhancer {
    pub fn new(threshold: usize) -> Self {
        InstructionEnhancer { threshold }
    }

    pub fn enhance(&self, document: &Html, recipe: &mut Recipe) {
        if recipe.instructions.len() <= self.threshold {
            self.replace_from_heading_spans(document, recipe);
        }

        let before = recipe.instructions.len();
        recipe.instructions.retain(|step| !is_footnote(step));
        if recipe.instructions.len() != before {
            debug!(
                "InstructionEnhancer: dropped {} footnote-like steps",
                before - recipe.instructions.len()
            );
        }

        if recipe.instructions.iter().any(|s| looks_like_section_heading(s)) {
            self.append_missing_steps(document, recipe);
        }
    }

    fn replace_from_heading_spans(&self, document: &Html, recipe: &mut Recipe) {
        let spans = instruction_heading_spans(document);
        if spans.is_empty() || spans == recipe.instructions {
            return;
        }
        info!(
            "InstructionEnhancer: replacing {} extracted steps with {} steps found under the instructions heading",
            recipe.instructions.len(),
            spans.len()
        );
        recipe.instructions = spans;
    }

    fn append_missing_steps(&self, document: &Html, recipe: &mut Recipe) {
        let extra: Vec<String> = document
            .select(&SPAN_SELECTOR)
            .map(|span| element_text(&span))
            .filter(|text| has_continuation_cue(text) && is_instruction_like(text))
            .filter(|text| !recipe.instructions.iter().any(|s| s.contains(text.as_str())))
            .collect();
        let extra = most_specific(extra);
        if !extra.is_empty() {
            debug!("InstructionEnhancer: appending {} steps after a section heading", extra.len());
            recipe.instructions.extend(extra);
        }
    }
}

fn is_instruction_heading(element: &ElementRef) -> bool {
    let text = element_text(element).to_lowercase();
    let text = text.trim_end_matches(':').trim();
    INSTRUCTION_HEADINGS.contains(&text)
}

/// Instruction-shaped spans in the container around the first
/// "Instructions" heading, trying the parent then the grandparent.
fn instruction_heading_spans(document: &Html) -> Vec<String> {
    let Some(heading) = document.select(&HEADING_SELECTOR).find(is_instruction_heading) else {
        return Vec::new();
    };

    let containers = heading
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(2);

    for container in containers {
        let spans: Vec<String> = container
            .select(&SPAN_SELECTOR)
            .map(|span| element_text(&span))
            .filter(|text| is_instruction_like(text))
            .collect();
        let spans = most_specific(spans);
        if !spans.is_empty() {
            return spans;
        }
    }
    Vec::new()
}
