//! Word lists and patterns used to recognise ingredient- and
//! instruction-shaped text when no structured markup is available.

use once_cell::sync::Lazy;
use regex::Regex;

/// Verbs that mark a sentence as a cooking step.
pub const COOKING_VERBS: &[&str] = &[
    "steam", "melt", "add", "stir", "cook", "bake", "mix", "combine", "heat", "place",
    "sprinkle", "season", "drain", "remove", "return", "gradually", "continue", "crumble",
    "dot", "brown", "grill", "preheat", "roast", "whisk", "pour", "simmer", "boil", "fry",
    "saute", "sauté", "chop", "slice", "serve", "transfer", "bring", "cover", "fold",
    "spread", "toss", "beat", "knead", "blend",
];

/// Measurement units recognised after a quantity.
pub const MEASUREMENT_UNITS: &[&str] = &[
    "g", "kg", "mg", "ml", "l", "tbsp", "tsp", "tablespoons?", "teaspoons?", "cups?", "oz",
    "ounces?", "lbs?", "pounds?", "pinch", "cloves?", "cans?", "slices?", "sticks?",
];

/// Markers of footnotes and asides that sometimes look like steps.
pub const FOOTNOTE_MARKERS: &[&str] = &[
    "misnomer",
    "best made using bread that is beginning",
    "fresh breadcrumbs are simply",
    "fresh breadcrumbs can be frozen",
];

/// Openings of a step that is really a section heading.
pub const SECTION_HEADING_PREFIXES: &[&str] = &["to make the", "for the", "to prepare", "for serving"];

/// Cues used to find the steps that belong under a section heading.
pub const CONTINUATION_CUES: &[&str] = &[
    "stir", "transfer", "pour", "spoon", "oven", "°", "degrees", "until",
];

/// Minimum length of a scraped instruction.
pub const MIN_INSTRUCTION_LEN: usize = 15;

/// Maximum length of a scraped instruction; longer text is page copy.
pub const MAX_INSTRUCTION_LEN: usize = 1000;

static COOKING_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", COOKING_VERBS.join("|"))).unwrap()
});

static TEMPERATURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+\s*°\s*[CF]\b|\d+\s*degrees").unwrap());

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+\s*(?:minutes?|mins?|hours?|hrs?)\b").unwrap());

static QUANTITY_UNIT_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*(?:\d+(?:[./]\d+)?|[½¼¾⅓⅔])\s*(?:{})\b",
        MEASUREMENT_UNITS.join("|")
    ))
    .unwrap()
});

static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\d\s*(?:{})\b",
        MEASUREMENT_UNITS.join("|")
    ))
    .unwrap()
});

static QUANTITY_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+(?:[./ ]\d+)*|[½¼¾⅓⅔]|a |an |one |two )").unwrap());

static SENTENCE_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+|\n+").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn has_cooking_verb(text: &str) -> bool {
    COOKING_VERB_RE.is_match(text)
}

pub fn has_temperature(text: &str) -> bool {
    TEMPERATURE_RE.is_match(text)
}

pub fn has_duration(text: &str) -> bool {
    DURATION_RE.is_match(text)
}

/// A line that opens with a quantity and unit, e.g. "2 cups flour".
pub fn starts_with_quantity_unit(text: &str) -> bool {
    QUANTITY_UNIT_START_RE.is_match(text)
}

pub fn has_measurement(text: &str) -> bool {
    UNIT_RE.is_match(text)
}

/// Text that reads like a cooking step rather than an ingredient line.
pub fn is_instruction_like(text: &str) -> bool {
    let text = text.trim();
    if text.len() < MIN_INSTRUCTION_LEN || text.len() > MAX_INSTRUCTION_LEN {
        return false;
    }
    if starts_with_quantity_unit(text) {
        return false;
    }
    has_cooking_verb(text) || has_temperature(text) || has_duration(text)
}

/// Short line opening with a quantity, the usual shape of an ingredient.
pub fn is_ingredient_like(text: &str) -> bool {
    let text = text.trim();
    if text.len() < 3 || text.len() > 150 {
        return false;
    }
    starts_with_quantity_unit(text) || (QUANTITY_START_RE.is_match(text) && !has_cooking_verb(text))
}

pub fn is_footnote(text: &str) -> bool {
    let lower = text.to_lowercase();
    FOOTNOTE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A step such as "To make the sauce:" that heads a group of steps.
pub fn looks_like_section_heading(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    if SECTION_HEADING_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    lower.len() < 30 && (lower.starts_with("to ") || lower.starts_with("for "))
}

pub fn has_continuation_cue(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTINUATION_CUES.iter().any(|cue| lower.contains(cue))
}

/// Splits running text into trimmed sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE_SPLIT_RE
        .split(text)
        .map(normalize_whitespace)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}
