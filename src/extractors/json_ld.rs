use super::{Extractor, ParsingContext};
use crate::entities::decode_entities;
use crate::error::ExtractError;
use crate::heuristics::normalize_whitespace;
use crate::model::{IngredientSection, Ingredients, Nutrition, Recipe};
use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::Selector;
use serde_json::Value;

/// Maximum nesting depth searched for a Recipe node.
const MAX_SEARCH_DEPTH: usize = 8;

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type='application/ld+json']").unwrap());

static ISO_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+(?:-\d+)?)H)?(?:(\d+(?:-\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .unwrap()
});

static STEP_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:step\s*)?\d+[.):]\s*").unwrap());

pub struct JsonLdExtractor;

impl JsonLdExtractor {
    fn convert_to_recipe(&self, node: &Value) -> Recipe {
        let mut recipe = Recipe {
            title: node.get("name").and_then(as_text).unwrap_or_default(),
            description: node.get("description").and_then(as_text),
            image: node.get("image").and_then(as_image),
            prep_time: node.get("prepTime").and_then(as_text).map(|d| convert_duration(&d)),
            cook_time: node.get("cookTime").and_then(as_text).map(|d| convert_duration(&d)),
            total_time: node.get("totalTime").and_then(as_text).map(|d| convert_duration(&d)),
            servings: node
                .get("recipeYield")
                .or_else(|| node.get("yield"))
                .and_then(as_yield),
            ingredients: node
                .get("recipeIngredient")
                .or_else(|| node.get("ingredients"))
                .map(as_ingredients)
                .unwrap_or_default(),
            instructions: node
                .get("recipeInstructions")
                .map(as_instructions)
                .unwrap_or_default(),
            nutrition: node.get("nutrition").map(as_nutrition).unwrap_or_default(),
            author: node.get("author").and_then(as_author),
            ..Default::default()
        };

        if let Some(rating) = node.get("aggregateRating") {
            recipe.rating = rating.get("ratingValue").and_then(as_text);
            recipe.review_count = rating
                .get("ratingCount")
                .or_else(|| rating.get("reviewCount"))
                .and_then(as_text);
        }

        recipe
    }
}

impl Extractor for JsonLdExtractor {
    fn name(&self) -> &'static str {
        "json_ld"
    }

    fn parse(&self, context: &ParsingContext) -> Result<Recipe, ExtractError> {
        let scripts: Vec<_> = context.document.select(&SCRIPT_SELECTOR).collect();
        debug!("JsonLdExtractor: Found {} JSON-LD script tags", scripts.len());

        // Try each script element until we find a valid recipe
        for (index, script) in scripts.iter().enumerate() {
            let raw_json = script.text().collect::<String>();
            let parsed = serde_json::from_str::<Value>(raw_json.trim())
                .or_else(|_| serde_json::from_str::<Value>(&sanitize_json(&raw_json)));

            let json_ld = match parsed {
                Ok(json_ld) => json_ld,
                Err(e) => {
                    debug!("JsonLdExtractor: Failed to parse JSON-LD {}: {}", index, e);
                    continue;
                }
            };

            match find_recipe_node(&json_ld, 0) {
                Some(node) => {
                    let recipe = self.convert_to_recipe(node);
                    if recipe.has_content() {
                        return Ok(recipe);
                    }
                    debug!("JsonLdExtractor: Recipe node {} carried no usable fields", index);
                }
                None => debug!("JsonLdExtractor: No recipe found in JSON-LD {}", index),
            }
        }

        Err(ExtractError::ParseError(
            "No valid recipe found in any JSON-LD script".to_string(),
        ))
    }
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

/// Depth-first search for the first object typed as a Recipe, looking
/// through arrays, `@graph` wrappers and nested objects.
fn find_recipe_node(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Array(items) => items.iter().find_map(|item| find_recipe_node(item, depth + 1)),
        Value::Object(map) => {
            if is_recipe_type(value) {
                return Some(value);
            }
            if let Some(graph) = map.get("@graph") {
                if let Some(found) = find_recipe_node(graph, depth + 1) {
                    return Some(found);
                }
            }
            map.iter()
                .filter(|(key, _)| key.as_str() != "@graph")
                .find_map(|(_, child)| match child {
                    Value::Array(_) | Value::Object(_) => find_recipe_node(child, depth + 1),
                    _ => None,
                })
        }
        _ => None,
    }
}

fn clean(text: &str) -> Option<String> {
    let cleaned = normalize_whitespace(&decode_entities(text));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Scalar text from a string, number, `{text|name|@value}` object or the
/// first usable array element.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ["text", "name", "@value"]
            .iter()
            .find_map(|key| map.get(*key).and_then(as_text)),
        Value::Array(items) => items.iter().find_map(as_text),
        _ => None,
    }
}

fn as_image(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean(s),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(as_image),
        Value::Array(items) => items.iter().find_map(as_image),
        _ => None,
    }
}

fn as_yield(value: &Value) -> Option<String> {
    match value {
        // Prefer the descriptive entry ("4 servings") over a bare number
        Value::Array(items) => {
            let texts: Vec<String> = items.iter().filter_map(as_text).collect();
            texts
                .iter()
                .find(|s| s.contains(char::is_alphabetic))
                .or_else(|| texts.first())
                .cloned()
        }
        other => as_text(other),
    }
}

/// Keys holding a group's lines when an ingredient entry is a titled group.
const SECTION_ITEM_KEYS: &[&str] = &["recipeIngredient", "ingredients", "items"];
const SECTION_TITLE_KEYS: &[&str] = &["name", "title"];

/// Ingredient lines, kept as titled sections when the source groups them
/// (`[{"name": "For the sauce", "recipeIngredient": [..]}, ..]`).
pub(crate) fn as_ingredients(value: &Value) -> Ingredients {
    let Value::Array(entries) = value else {
        return ingredient_lines(value).into();
    };
    if !entries.iter().any(|entry| section_items(entry).is_some()) {
        return ingredient_lines(value).into();
    }

    let mut sections: Vec<IngredientSection> = Vec::new();
    for entry in entries {
        match section_items(entry) {
            Some(group) => sections.push(IngredientSection {
                title: SECTION_TITLE_KEYS
                    .iter()
                    .find_map(|key| entry.get(key).and_then(as_text))
                    .unwrap_or_default(),
                items: ingredient_lines(group),
            }),
            // Loose lines join the section before them
            None => {
                let Some(line) = ingredient_line(entry) else { continue };
                match sections.last_mut() {
                    Some(section) => section.items.push(line),
                    None => sections.push(IngredientSection {
                        title: String::new(),
                        items: vec![line],
                    }),
                }
            }
        }
    }
    sections.retain(|section| !section.items.is_empty());
    Ingredients::Sections(sections)
}

fn section_items(entry: &Value) -> Option<&Value> {
    let map = entry.as_object()?;
    SECTION_ITEM_KEYS
        .iter()
        .find_map(|key| map.get(*key).filter(|items| items.is_array()))
}

fn ingredient_lines(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s.lines().filter_map(clean).collect(),
        Value::Array(items) => items.iter().filter_map(ingredient_line).collect(),
        _ => Vec::new(),
    }
}

fn ingredient_line(item: &Value) -> Option<String> {
    match item {
        Value::Object(map) => {
            let name = map.get("name").and_then(as_text)?;
            match map.get("amount").and_then(as_text) {
                Some(amount) => Some(format!("{amount} {name}")),
                None => Some(name),
            }
        }
        other => as_text(other),
    }
}

pub(crate) fn as_instructions(value: &Value) -> Vec<String> {
    let mut steps = Vec::new();
    collect_steps(value, &mut steps, 0);
    steps
}

fn collect_steps(value: &Value, steps: &mut Vec<String>, depth: usize) {
    if depth > MAX_SEARCH_DEPTH {
        return;
    }
    match value {
        Value::String(s) => {
            let decoded = decode_entities(s);
            steps.extend(decoded.lines().filter_map(|line| {
                let line = STEP_NUMBER_RE.replace(line, "");
                clean(&line)
            }));
        }
        Value::Array(items) => {
            for item in items {
                collect_steps(item, steps, depth + 1);
            }
        }
        Value::Object(map) => {
            if let Some(elements) = map.get("itemListElement") {
                collect_steps(elements, steps, depth + 1);
            } else if let Some(text) = map
                .get("text")
                .or_else(|| map.get("name"))
                .or_else(|| map.get("description"))
            {
                collect_steps(text, steps, depth + 1);
            }
        }
        _ => {}
    }
}

fn as_nutrition(value: &Value) -> Nutrition {
    Nutrition {
        calories: value.get("calories").and_then(as_text),
        protein: value.get("proteinContent").and_then(as_text),
        carbs: value.get("carbohydrateContent").and_then(as_text),
        fat: value.get("fatContent").and_then(as_text),
    }
}

fn as_author(value: &Value) -> Option<String> {
    match value {
        Value::Array(authors) => {
            let names: Vec<String> = authors.iter().filter_map(as_author).collect();
            if names.is_empty() {
                None
            } else {
                Some(names.join(", "))
            }
        }
        Value::Object(map) => map.get("name").and_then(as_text),
        other => as_text(other),
    }
}

/// Converts an ISO 8601 duration to short text, e.g. `PT1H30M` -> `1h 30m`.
/// Ranges like `PT15-20M` are kept as ranges; anything unparseable passes
/// through unchanged.
pub(crate) fn convert_duration(duration: &str) -> String {
    let trimmed = duration.trim();
    let Some(caps) = ISO_DURATION_RE.captures(trimmed) else {
        return trimmed.to_string();
    };
    if caps.iter().skip(1).all(|c| c.is_none()) {
        return trimmed.to_string();
    }

    let hours = caps.get(2).map(|m| m.as_str());
    let minutes = caps.get(3).map(|m| m.as_str());

    // Ranges can't be summed, keep their components as written
    if hours.is_some_and(|h| h.contains('-')) || minutes.is_some_and(|m| m.contains('-')) {
        let mut parts = Vec::new();
        if let Some(h) = hours {
            parts.push(format!("{h}h"));
        }
        if let Some(m) = minutes {
            parts.push(format!("{m}m"));
        }
        return parts.join(" ");
    }

    let Some(total_minutes) = total_minutes(&caps) else {
        return trimmed.to_string();
    };

    let (h, m) = (total_minutes / 60, total_minutes % 60);
    match (h, m) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Sums the captured components into whole minutes; `None` when a
/// component is too large to represent.
fn total_minutes(caps: &Captures) -> Option<u64> {
    let component = |i: usize| match caps.get(i) {
        Some(m) => m.as_str().parse::<u64>().ok(),
        None => Some(0),
    };
    let seconds = caps
        .get(4)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let second_minutes = (seconds / 60.0).round();
    if !second_minutes.is_finite() || second_minutes >= u64::MAX as f64 {
        return None;
    }

    component(1)?
        .checked_mul(24 * 60)?
        .checked_add(component(2)?.checked_mul(60)?)?
        .checked_add(component(3)?)?
        .checked_add(second_minutes as u64)
}

/// Repairs common JSON-LD mistakes: raw newlines inside strings, missing
/// commas between members, trailing or doubled commas.
fn sanitize_json(json_str: &str) -> String {
    let mut minified = String::with_capacity(json_str.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0i32;
    let chars: Vec<char> = json_str.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    minified.push(c);
                }
                '\\' => {
                    escaped = true;
                    minified.push(c);
                }
                '"' => {
                    in_string = false;
                    minified.push(c);
                    // Two strings in a row means a missing comma
                    let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                    if depth > 0 && matches!(next, Some('"')) {
                        minified.push(',');
                    }
                }
                '\n' | '\r' | '\t' => minified.push(' '),
                _ => minified.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                minified.push(c);
            }
            '[' | '{' => {
                depth += 1;
                minified.push(c);
            }
            ']' | '}' => {
                depth -= 1;
                if minified.ends_with(',') {
                    minified.pop();
                }
                minified.push(c);
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if depth > 0 && matches!(next, Some('"' | '{' | '[')) {
                    minified.push(',');
                }
            }
            ',' => {
                // Avoid duplicate commas
                if !minified.ends_with(',') {
                    minified.push(c);
                }
            }
            _ if c.is_whitespace() => {}
            _ => minified.push(c),
        }
    }

    minified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_for(json_ld: &str) -> ParsingContext {
        ParsingContext::new(&format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                <script type="application/ld+json">
                    {json_ld}
                </script>
            </head>
            <body></body>
            </html>
            "#
        ))
    }

    #[test]
    fn test_parse_without_json_ld_fails() {
        let context = ParsingContext::new("<html><body>Test</body></html>");
        assert!(JsonLdExtractor.parse(&context).is_err());
    }

    #[test]
    fn test_parse_basic_recipe() {
        let json_ld = r#"
        {
            "@context": "https://schema.org/",
            "@type": "Recipe",
            "name": "Chocolate Chip Cookies",
            "description": "Delicious homemade cookies",
            "image": "https://example.com/cookie.jpg",
            "recipeIngredient": ["2 cups flour", "1 cup sugar", "chocolate chips"],
            "recipeInstructions": [{"@type": "HowToStep", "text": "Mix well."}],
            "author": "Jane Doe",
            "prepTime": "PT15M",
            "cookTime": "PT10M",
            "totalTime": "PT1H25M",
            "recipeYield": ["24", "24 cookies"],
            "nutrition": {"@type": "NutritionInformation", "calories": "120 kcal", "fatContent": "6 g"},
            "aggregateRating": {"ratingValue": 4.8, "ratingCount": "312"}
        }
        "#;

        let recipe = JsonLdExtractor.parse(&context_for(json_ld)).unwrap();

        assert_eq!(recipe.title, "Chocolate Chip Cookies");
        assert_eq!(recipe.description.as_deref(), Some("Delicious homemade cookies"));
        assert_eq!(recipe.image.as_deref(), Some("https://example.com/cookie.jpg"));
        assert_eq!(recipe.ingredients.lines(), vec!["2 cups flour", "1 cup sugar", "chocolate chips"]);
        assert_eq!(recipe.instructions, vec!["Mix well."]);
        assert_eq!(recipe.author.as_deref(), Some("Jane Doe"));
        assert_eq!(recipe.prep_time.as_deref(), Some("15m"));
        assert_eq!(recipe.total_time.as_deref(), Some("1h 25m"));
        assert_eq!(recipe.servings.as_deref(), Some("24 cookies"));
        assert_eq!(recipe.nutrition.calories.as_deref(), Some("120 kcal"));
        assert_eq!(recipe.nutrition.fat.as_deref(), Some("6 g"));
        assert!(recipe.nutrition.protein.is_none());
        assert_eq!(recipe.rating.as_deref(), Some("4.8"));
        assert_eq!(recipe.review_count.as_deref(), Some("312"));
        assert!(recipe.metadata.instructions_generated.is_none());
    }

    #[test]
    fn test_recipe_inside_graph_with_type_array() {
        let json_ld = r#"
        {
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "WebSite", "name": "Food Blog"},
                {"@type": ["Recipe", "NewsArticle"], "name": "Pasta Carbonara",
                 "image": [{"@type": "ImageObject", "url": "https://example.com/carbonara.jpg"}],
                 "author": [{"@type": "Person", "name": "Chef One"}, {"@type": "Person", "name": "Chef Two"}],
                 "recipeIngredient": ["spaghetti", "eggs"],
                 "recipeInstructions": [
                    {"@type": "HowToSection", "name": "Pasta", "itemListElement": [
                        {"@type": "HowToStep", "text": "Cook the pasta."},
                        {"@type": "HowToStep", "text": "Fry the guanciale."}
                    ]},
                    {"@type": "HowToStep", "text": "Toss with eggs &amp; cheese."}
                 ]}
            ]
        }
        "#;

        let recipe = JsonLdExtractor.parse(&context_for(json_ld)).unwrap();
        assert_eq!(recipe.title, "Pasta Carbonara");
        assert_eq!(recipe.image.as_deref(), Some("https://example.com/carbonara.jpg"));
        assert_eq!(recipe.author.as_deref(), Some("Chef One, Chef Two"));
        assert_eq!(
            recipe.instructions,
            vec!["Cook the pasta.", "Fry the guanciale.", "Toss with eggs & cheese."]
        );
    }

    #[test]
    fn test_recipe_in_top_level_array() {
        let json_ld = r#"
        [
            {"@type": "BreadcrumbList", "itemListElement": []},
            {"@type": "recipe", "name": "Soup", "recipeIngredient": ["water"],
             "recipeInstructions": "1. Boil the water.\n2. Add salt."}
        ]
        "#;
        let recipe = JsonLdExtractor.parse(&context_for(json_ld)).unwrap();
        assert_eq!(recipe.title, "Soup");
        assert_eq!(recipe.instructions, vec!["Boil the water.", "Add salt."]);
    }

    #[test]
    fn test_mismatched_field_types_do_not_reject_recipe() {
        let json_ld = r#"
        {
            "@type": "Recipe",
            "name": "Odd Recipe",
            "image": 42,
            "recipeYield": 4,
            "author": {"@id": "https://example.com/#author"},
            "recipeIngredient": ["1 egg", "", null],
            "recipeInstructions": "Whisk the egg."
        }
        "#;
        let recipe = JsonLdExtractor.parse(&context_for(json_ld)).unwrap();
        assert!(recipe.image.is_none());
        assert!(recipe.author.is_none());
        assert_eq!(recipe.servings.as_deref(), Some("4"));
        assert_eq!(recipe.ingredients.lines(), vec!["1 egg"]);
    }

    #[test]
    fn test_grouped_ingredients_become_sections() {
        let json_ld = r#"
        {
            "@type": "Recipe",
            "name": "Chicken Tikka",
            "recipeIngredient": [
                "salt",
                {"name": "For the marinade", "recipeIngredient": ["200g yogurt", "1 tsp garam masala"]},
                {"title": "For the sauce", "items": ["1 onion", "400g tomatoes"]},
                "fresh coriander",
                {"name": "Empty group", "recipeIngredient": []}
            ],
            "recipeInstructions": ["Marinate the chicken.", "Cook the sauce."]
        }
        "#;
        let recipe = JsonLdExtractor.parse(&context_for(json_ld)).unwrap();

        let Ingredients::Sections(sections) = &recipe.ingredients else {
            panic!("expected sections, got {:?}", recipe.ingredients);
        };
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["", "For the marinade", "For the sauce"]);
        assert_eq!(sections[2].items, vec!["1 onion", "400g tomatoes", "fresh coriander"]);
        assert_eq!(recipe.ingredients.len(), 6);
        assert_eq!(recipe.ingredients.lines()[1], "200g yogurt");
    }

    #[test]
    fn test_ingredient_objects_without_groups_stay_flat() {
        let value = serde_json::json!([{"name": "flour", "amount": "2 cups"}, "1 egg"]);
        assert_eq!(
            as_ingredients(&value),
            Ingredients::Flat(vec!["2 cups flour".to_string(), "1 egg".to_string()])
        );
    }

    #[test]
    fn test_sanitize_recovers_sloppy_json() {
        let json_ld = r#"
        {
            "@type": "Recipe",
            "name": "Sloppy"
            "recipeIngredient": ["salt", "pepper",],
            "recipeInstructions": ["Season it."],
        }
        "#;
        let recipe = JsonLdExtractor.parse(&context_for(json_ld)).unwrap();
        assert_eq!(recipe.title, "Sloppy");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.instructions, vec!["Season it."]);
    }

    #[test]
    fn test_duration_conversion() {
        assert_eq!(convert_duration("PT30M"), "30m");
        assert_eq!(convert_duration("PT1H"), "1h");
        assert_eq!(convert_duration("PT1H30M"), "1h 30m");
        assert_eq!(convert_duration("PT90M"), "1h 30m");
        assert_eq!(convert_duration("PT5400.0S"), "1h 30m");
        assert_eq!(convert_duration("P1DT2H"), "26h");
        assert_eq!(convert_duration("PT15-20M"), "15-20m");
        assert_eq!(convert_duration("invalid"), "invalid");
        assert_eq!(convert_duration("PT"), "PT");
        assert_eq!(convert_duration("20 minutes"), "20 minutes");
        // Components too large to sum pass through instead of overflowing
        assert_eq!(convert_duration("P99999999999999999D"), "P99999999999999999D");
        assert_eq!(convert_duration("PT99999999999999999999H"), "PT99999999999999999999H");
        assert_eq!(convert_duration("P1DT18446744073709551615M"), "P1DT18446744073709551615M");
    }
}
