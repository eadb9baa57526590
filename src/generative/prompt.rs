use crate::model::Recipe;

/// Instructions for turning a caption into a recipe JSON object.
///
/// Loaded from `recipe_prompt.txt` at compile time so the wording can be
/// edited without Rust string escaping.
pub const RECIPE_EXTRACTION_PROMPT: &str = include_str!("recipe_prompt.txt");

/// Instructions for writing the steps of an ingredients-only recipe.
pub const INSTRUCTION_GENERATION_PROMPT: &str = include_str!("instructions_prompt.txt");

/// Build the extraction prompt for one caption.
pub fn build_recipe_prompt(caption: &str, source_url: Option<&str>) -> String {
    let source = source_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| format!("Source: {url}\n"))
        .unwrap_or_default();
    format!("{RECIPE_EXTRACTION_PROMPT}\n{source}Caption:\n\"\"\"\n{}\n\"\"\"", caption.trim())
}

/// Build the instruction-generation prompt for a recipe.
pub fn build_instructions_prompt(recipe: &Recipe, caption: Option<&str>) -> String {
    let ingredients = recipe
        .ingredients
        .lines()
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "{INSTRUCTION_GENERATION_PROMPT}\nTitle: {}\nIngredients:\n{ingredients}\n",
        recipe.title
    );
    if let Some(caption) = caption.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("\nOriginal caption for context:\n\"\"\"\n{caption}\n\"\"\"\n"));
    }
    prompt
}
