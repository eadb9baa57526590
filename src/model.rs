use serde::{Deserialize, Serialize};

/// Title used when no title could be recovered from the source.
pub const UNTITLED_RECIPE: &str = "Untitled Recipe";

/// Image sentinel for recipes that came from an Instagram video post.
pub const INSTAGRAM_VIDEO_IMAGE: &str = "instagram-video";

/// Image sentinel for recipes that came from a Facebook video post.
pub const FACEBOOK_VIDEO_IMAGE: &str = "facebook-video";

/// The canonical recipe record produced by every extraction path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Image URL, or one of the video sentinels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<String>,
    /// "Easy", "Medium" or "Hard" by convention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub ingredients: Ingredients,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub nutrition: Nutrition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub metadata: RecipeMetadata,
}

impl Recipe {
    /// True when at least one of title, ingredients or instructions was recovered.
    pub fn has_content(&self) -> bool {
        !self.title.trim().is_empty()
            || !self.ingredients.is_empty()
            || !self.instructions.is_empty()
    }

    /// Whether the instructions were written by a generative model.
    pub fn instructions_generated(&self) -> bool {
        self.metadata.instructions_generated == Some(true)
    }

    /// Marks the instructions as synthesized rather than scraped.
    pub fn mark_instructions_generated(&mut self) {
        self.metadata.instructions_generated = Some(true);
    }
}

/// Ingredient list, either flat or split into titled sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ingredients {
    Flat(Vec<String>),
    Sections(Vec<IngredientSection>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientSection {
    pub title: String,
    pub items: Vec<String>,
}

impl Default for Ingredients {
    fn default() -> Self {
        Ingredients::Flat(Vec::new())
    }
}

impl From<Vec<String>> for Ingredients {
    fn from(items: Vec<String>) -> Self {
        Ingredients::Flat(items)
    }
}

impl Ingredients {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ingredient lines across all sections.
    pub fn len(&self) -> usize {
        match self {
            Ingredients::Flat(items) => items.len(),
            Ingredients::Sections(sections) => sections.iter().map(|s| s.items.len()).sum(),
        }
    }

    /// All ingredient lines in order, section titles dropped.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Ingredients::Flat(items) => items.iter().map(String::as_str).collect(),
            Ingredients::Sections(sections) => sections
                .iter()
                .flat_map(|s| s.items.iter().map(String::as_str))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<String>,
}

impl Nutrition {
    pub fn is_empty(&self) -> bool {
        self.calories.is_none() && self.protein.is_none() && self.carbs.is_none() && self.fat.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_generated: Option<bool>,
}

/// Social platform a caption was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Instagram,
    Facebook,
}

const INSTAGRAM_DOMAINS: &[&str] = &["instagram.com", "instagr.am"];
const FACEBOOK_DOMAINS: &[&str] = &["facebook.com", "fb.watch", "fb.com"];

impl Platform {
    /// Platform served from `host`, matching the domain or any subdomain.
    pub fn from_host(host: &str) -> Option<Platform> {
        let host = host.to_ascii_lowercase();
        let matches = |domains: &[&str]| {
            domains
                .iter()
                .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
        };
        if matches(INSTAGRAM_DOMAINS) {
            Some(Platform::Instagram)
        } else if matches(FACEBOOK_DOMAINS) {
            Some(Platform::Facebook)
        } else {
            None
        }
    }

    /// Image sentinel telling the UI to show a platform placeholder.
    pub fn video_image(&self) -> &'static str {
        match self {
            Platform::Instagram => INSTAGRAM_VIDEO_IMAGE,
            Platform::Facebook => FACEBOOK_VIDEO_IMAGE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
        }
    }
}
