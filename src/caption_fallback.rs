//! Low-confidence, ingredients-only recipes mined from caption text.

use crate::model::{Nutrition, Platform, Recipe};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

pub const FALLBACK_TITLE: &str = "Recipe from Social Media";

pub const PLACEHOLDER_PREP_TIME: &str = "15 minutes";
pub const PLACEHOLDER_COOK_TIME: &str = "20 minutes";
pub const PLACEHOLDER_TOTAL_TIME: &str = "35 minutes";
pub const PLACEHOLDER_SERVINGS: &str = "2";
pub const PLACEHOLDER_DIFFICULTY: &str = "Medium";
pub const PLACEHOLDER_CALORIES: &str = "400";
pub const PLACEHOLDER_PROTEIN: &str = "20g";
pub const PLACEHOLDER_CARBS: &str = "40g";
pub const PLACEHOLDER_FAT: &str = "15g";

pub const CAPTION_UNITS: &[&str] = &[
    "kg", "g", "ml", "l", "tbsp", "tsp", "cups", "cup", "oz", "lbs", "lb", "pounds", "pound",
];

/// Words that end a bare ingredient phrase.
pub const FOOD_NOUNS: &[&str] = &[
    "breast", "breasts", "thigh", "thighs", "sauce", "oil", "flour", "cheese", "butter", "sugar",
    "cream", "milk", "stock", "broth", "vinegar", "paste", "powder", "seeds", "beans", "juice",
    "syrup", "honey", "yogurt", "mince", "fillet", "fillets", "leaves", "flakes",
];

/// Dish-type words a caption title usually ends with.
pub const DISH_NOUNS: &[&str] = &[
    "pasta", "salad", "curry", "soup", "stew", "tacos", "bowl", "sandwich", "burger", "pizza",
    "cake", "cookies", "bread", "noodles", "pie", "wrap", "wraps", "chili", "risotto", "omelette",
    "pancakes", "brownies", "smoothie", "lasagna", "stir-fry", "casserole", "dumplings",
];

/// Matches containing any of these are promotional or nutrition text.
pub const STOP_WORDS: &[&str] = &[
    "serves", "serving", "calories", "kcal", "protein", "carbs", "fat", "dm", "link", "recipe",
    "follow", "comment", "bio", "like", "share", "save", "subscribe", "tag",
];

/// Connector words trimmed from either end of a phrase.
const FILLER_WORDS: &[&str] = &[
    "a", "an", "and", "the", "of", "with", "some", "then", "to", "in", "for", "or", "add", "plus",
];

const MIN_INGREDIENT_LEN: usize = 3;
const MAX_TITLE_WORDS: usize = 7;

static QUANTITY_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b\d+(?:[./]\d+)?\s*(?:{})\b(?:\s+[A-Za-z][A-Za-z'-]*){{1,4}}",
        CAPTION_UNITS.join("|")
    ))
    .unwrap()
});

static FOOD_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:[A-Za-z][A-Za-z'-]*\s+){{0,2}}(?:{})\b",
        FOOD_NOUNS.join("|")
    ))
    .unwrap()
});

static FRAGMENT_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?\n|:]+").unwrap());

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]*").unwrap());

#[derive(Debug, Clone, Default)]
pub struct CaptionHeuristicFallback;

impl CaptionHeuristicFallback {
    pub fn new() -> Self {
        CaptionHeuristicFallback
    }

    /// Builds an ingredients-only recipe with placeholder timings. The
    /// instructions stay empty for a later generation pass.
    pub fn extract(&self, caption: &str, source_url: Option<&str>) -> Option<Recipe> {
        let ingredients = mine_ingredients(caption);
        if ingredients.is_empty() {
            debug!("CaptionHeuristicFallback: no ingredients in caption");
            return None;
        }
        debug!("CaptionHeuristicFallback: mined {} ingredients", ingredients.len());

        let platform = source_url
            .and_then(|url| url::Url::parse(url).ok())
            .and_then(|url| url.host_str().and_then(Platform::from_host));

        Some(Recipe {
            title: derive_title(caption).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            image: platform.map(|p| p.video_image().to_string()),
            prep_time: Some(PLACEHOLDER_PREP_TIME.to_string()),
            cook_time: Some(PLACEHOLDER_COOK_TIME.to_string()),
            total_time: Some(PLACEHOLDER_TOTAL_TIME.to_string()),
            servings: Some(PLACEHOLDER_SERVINGS.to_string()),
            difficulty: Some(PLACEHOLDER_DIFFICULTY.to_string()),
            ingredients: ingredients.into(),
            nutrition: Nutrition {
                calories: Some(PLACEHOLDER_CALORIES.to_string()),
                protein: Some(PLACEHOLDER_PROTEIN.to_string()),
                carbs: Some(PLACEHOLDER_CARBS.to_string()),
                fat: Some(PLACEHOLDER_FAT.to_string()),
            },
            ..Default::default()
        })
    }
}

fn is_filler(word: &str) -> bool {
    FILLER_WORDS.contains(&word.to_lowercase().as_str())
}

/// Strips connector words from both ends of a phrase.
fn trim_fillers(phrase: &str) -> String {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let start = words.iter().position(|w| !is_filler(w)).unwrap_or(words.len());
    let end = words.iter().rposition(|w| !is_filler(w)).map_or(start, |i| i + 1);
    words[start..end.max(start)].join(" ")
}

fn has_stop_word(phrase: &str) -> bool {
    WORD_RE
        .find_iter(phrase)
        .any(|word| STOP_WORDS.contains(&word.as_str().to_lowercase().as_str()))
}

/// Quantity+unit phrases first, then bare food phrases not already
/// covered word for word, deduplicated case-insensitively in caption order.
pub fn mine_ingredients(caption: &str) -> Vec<String> {
    let measured = QUANTITY_UNIT_RE
        .find_iter(caption)
        .map(|m| trim_fillers(m.as_str()));
    let bare = FOOD_PHRASE_RE
        .find_iter(caption)
        .map(|m| trim_fillers(m.as_str()));

    measured
        .chain(bare)
        .filter(|phrase| phrase.chars().count() >= MIN_INGREDIENT_LEN && !has_stop_word(phrase))
        .fold(Vec::<String>::new(), |mut kept, phrase| {
            if !kept.iter().any(|k| covers_words(k, &phrase)) {
                kept.push(phrase);
            }
            kept
        })
}

fn lower_words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Whether `phrase` appears in `kept` as a whole run of words, ignoring case.
fn covers_words(kept: &str, phrase: &str) -> bool {
    let needle = lower_words(phrase);
    if needle.is_empty() {
        return false;
    }
    lower_words(kept)
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}

/// First capitalised run of words, within one sentence fragment, that
/// ends on a dish noun.
pub fn derive_title(caption: &str) -> Option<String> {
    FRAGMENT_SPLIT_RE.split(caption).find_map(|fragment| {
        let words: Vec<&str> = WORD_RE.find_iter(fragment).map(|m| m.as_str()).collect();
        let start = words
            .iter()
            .position(|w| w.chars().next().is_some_and(char::is_uppercase))?;
        words
            .iter()
            .enumerate()
            .skip(start)
            .take(MAX_TITLE_WORDS)
            .find(|(_, word)| DISH_NOUNS.contains(&word.to_lowercase().as_str()))
            .map(|(end, _)| words[start..=end].join(" "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTION: &str = "Creamy Garlic Pasta 🍝 ready in 20 min!\n200g spaghetti, 3 tbsp butter and 2 cups chicken stock. Finish with parmesan cheese.\nFollow for more recipes, link in bio! 550 calories";

    #[test]
    fn test_mines_measured_and_bare_ingredients() {
        let ingredients = mine_ingredients(CAPTION);
        assert_eq!(
            ingredients,
            vec!["200g spaghetti", "3 tbsp butter", "2 cups chicken stock", "parmesan cheese"]
        );
    }

    #[test]
    fn test_title_from_capitalised_fragment() {
        assert_eq!(derive_title(CAPTION).as_deref(), Some("Creamy Garlic Pasta"));
        assert_eq!(derive_title("quick dinner tonight, no title here"), None);
        assert_eq!(derive_title("my favourite. Spicy Peanut Noodles for two"), Some("Spicy Peanut Noodles".to_string()));
    }

    #[test]
    fn test_recipe_has_placeholders_and_no_instructions() {
        let recipe = CaptionHeuristicFallback::new()
            .extract(CAPTION, Some("https://www.instagram.com/reel/ABC123/"))
            .unwrap();

        assert_eq!(recipe.title, "Creamy Garlic Pasta");
        assert!(recipe.instructions.is_empty());
        assert!(!recipe.instructions_generated());
        assert_eq!(recipe.prep_time.as_deref(), Some(PLACEHOLDER_PREP_TIME));
        assert_eq!(recipe.total_time.as_deref(), Some(PLACEHOLDER_TOTAL_TIME));
        assert_eq!(recipe.servings.as_deref(), Some("2"));
        assert_eq!(recipe.difficulty.as_deref(), Some("Medium"));
        assert_eq!(recipe.image.as_deref(), Some("instagram-video"));
    }

    #[test]
    fn test_generic_title_and_no_ingredients() {
        let recipe = CaptionHeuristicFallback::new()
            .extract("weeknight fave: 500g chicken thighs, soy sauce", None)
            .unwrap();
        assert_eq!(recipe.title, FALLBACK_TITLE);
        assert_eq!(recipe.ingredients.lines(), vec!["500g chicken thighs", "soy sauce"]);

        assert!(CaptionHeuristicFallback::new()
            .extract("Follow me for daily recipes! Link in bio.", None)
            .is_none());
    }

    #[test]
    fn test_stop_words_and_short_matches_dropped() {
        let ingredients = mine_ingredients("30g protein per serving, 1 l milk, 2 oz oil");
        assert_eq!(ingredients, vec!["1 l milk", "2 oz oil"]);
    }

    #[test]
    fn test_dedupe_matches_whole_words() {
        let ingredients = mine_ingredients("Boiling water for 2 tbsp oil, then olive oil and Olive Oil.");
        assert!(ingredients.contains(&"2 tbsp oil".to_string()));
        assert!(!ingredients.iter().any(|i| i.eq_ignore_ascii_case("oil")));
        assert_eq!(ingredients.iter().filter(|i| i.eq_ignore_ascii_case("olive oil")).count(), 1);

        assert!(covers_words("2 cups chicken stock", "Chicken Stock"));
        assert!(!covers_words("boiling water", "oil"));
    }
}
