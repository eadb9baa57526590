//! Caption and image recovery from a social post's HTML.

use crate::entities::clean_escaped_text;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

/// Script-embedded captions at or below this length are ignored.
pub const MIN_SCRIPT_CAPTION_LEN: usize = 50;

static META_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());

/// JSON string fields that hold a post caption, most specific first.
static CAPTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""edge_media_to_caption"\s*:\s*\{\s*"edges"\s*:\s*\[\s*\{\s*"node"\s*:\s*\{\s*"text"\s*:\s*"((?:[^"\\]|\\.)*)""#,
        r#""caption"\s*:\s*\{[^{}]*?"text"\s*:\s*"((?:[^"\\]|\\.)*)""#,
        r#""caption"\s*:\s*"((?:[^"\\]|\\.)*)""#,
        r#""articleBody"\s*:\s*"((?:[^"\\]|\\.)*)""#,
        r#""description"\s*:\s*"((?:[^"\\]|\\.)*)""#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// JSON string fields that hold the post's display image.
static IMAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["display_url", "display_src", "thumbnail_src"]
        .iter()
        .map(|key| Regex::new(&format!(r#""{key}"\s*:\s*"((?:[^"\\]|\\.)*)""#)).unwrap())
        .collect()
});

static SHARED_DATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)window\._sharedData\s*=\s*(\{.*\})\s*;?\s*$").unwrap());

/// What a single HTML document revealed about a post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageData {
    pub caption: Option<String>,
    pub image: Option<String>,
}

/// Recovers the caption and image of a post page.
///
/// Caption priority, highest first: the `_sharedData` caption, which always
/// wins; the longest caption-shaped string in any inline script; a JSON-LD
/// caption; and last the `og:description` meta tag, which is often
/// truncated.
pub fn extract_data_from_html(html: &str) -> PageData {
    let document = Html::parse_document(html);

    let meta_caption = meta_content(&document, &["og:description"]);
    let mut image = meta_content(&document, &["og:image", "twitter:image"]);

    let scripts: Vec<(Option<String>, String)> = document
        .select(&SCRIPT_SELECTOR)
        .map(|script| {
            (
                script.value().attr("type").map(str::to_ascii_lowercase),
                script.text().collect::<String>(),
            )
        })
        .collect();

    let json_ld = scripts
        .iter()
        .filter(|(kind, _)| kind.as_deref() == Some("application/ld+json"))
        .filter_map(|(_, body)| serde_json::from_str::<Value>(body).ok())
        .map(|value| json_ld_data(&value))
        .fold(PageData::default(), |acc, data| PageData {
            caption: acc.caption.or(data.caption),
            image: acc.image.or(data.image),
        });
    image = image.or(json_ld.image);

    let shared = scripts
        .iter()
        .find_map(|(_, body)| shared_data(body))
        .unwrap_or_default();
    image = image.or(shared.image);

    let script_caption = scripts
        .iter()
        .flat_map(|(_, body)| script_captions(body))
        .fold(None, longest);

    if image.is_none() {
        image = scripts.iter().find_map(|(_, body)| script_image(body));
    }

    let caption = shared
        .caption
        .or(script_caption)
        .or(json_ld.caption)
        .or(meta_caption.map(|text| clean_escaped_text(&text)))
        .filter(|caption| !caption.is_empty());

    debug!(
        "extract_data_from_html: caption {} chars, image {}",
        caption.as_ref().map_or(0, |c| c.chars().count()),
        image.is_some()
    );

    PageData { caption, image }
}

/// Keeps the longer of two candidates, favouring the earlier on ties.
fn longest(best: Option<String>, candidate: String) -> Option<String> {
    match best {
        Some(current) if current.chars().count() >= candidate.chars().count() => Some(current),
        _ => Some(candidate),
    }
}

fn meta_content(document: &Html, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        document.select(&META_SELECTOR).find_map(|meta| {
            let element = meta.value();
            let name = element.attr("property").or_else(|| element.attr("name"))?;
            if !name.eq_ignore_ascii_case(key) {
                return None;
            }
            element
                .attr("content")
                .map(str::trim)
                .filter(|content| !content.is_empty())
                .map(str::to_string)
        })
    })
}

fn json_ld_data(value: &Value) -> PageData {
    match value {
        Value::Array(items) => items
            .iter()
            .map(json_ld_data)
            .find(|data| data.caption.is_some())
            .unwrap_or_default(),
        Value::Object(map) => {
            let caption = ["caption", "articleBody", "description"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(clean_escaped_text)
                .filter(|text| !text.is_empty());
            let image = map.get("image").and_then(|image| match image {
                Value::String(url) => Some(url.clone()),
                Value::Array(urls) => urls.first().and_then(Value::as_str).map(str::to_string),
                Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(str::to_string),
                _ => None,
            });
            PageData { caption, image }
        }
        _ => PageData::default(),
    }
}

fn shared_data(script: &str) -> Option<PageData> {
    let captures = SHARED_DATA_RE.captures(script.trim())?;
    let value: Value = serde_json::from_str(&captures[1]).ok()?;
    let media = &value["entry_data"]["PostPage"][0]["graphql"]["shortcode_media"];
    if media.is_null() {
        return None;
    }

    let caption = media["edge_media_to_caption"]["edges"][0]["node"]["text"]
        .as_str()
        .map(clean_escaped_text)
        .filter(|text| !text.is_empty());
    let image = media["display_url"].as_str().map(str::to_string);
    Some(PageData { caption, image })
}

fn script_captions(script: &str) -> Vec<String> {
    CAPTION_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(script))
        .map(|captures| clean_escaped_text(&captures[1]))
        .filter(|text| text.chars().count() > MIN_SCRIPT_CAPTION_LEN)
        .collect()
}

fn script_image(script: &str) -> Option<String> {
    IMAGE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(script))
        .map(|captures| clean_escaped_text(&captures[1]))
        .filter(|url| url.starts_with("http"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_caption(len: usize) -> String {
        let base = "Creamy garlic pasta with 200g spaghetti and 2 tbsp butter. ";
        let mut caption: String = base.chars().cycle().take(len - 1).collect();
        caption.push('!');
        caption
    }

    #[test]
    fn test_shared_data_caption_beats_meta_description() {
        let meta = "a".repeat(60);
        let shared = long_caption(400);
        let html = format!(
            r#"<html><head>
                <meta property="og:description" content="{meta}">
                <meta property="og:image" content="https://cdn.example.com/og.jpg">
            </head><body>
                <script>window._sharedData = {{"entry_data": {{"PostPage": [{{"graphql": {{"shortcode_media": {{
                    "display_url": "https://cdn.example.com/full.jpg",
                    "edge_media_to_caption": {{"edges": [{{"node": {{"text": "{shared}"}}}}]}}
                }}}}}}]}}}};</script>
            </body></html>"#
        );

        let data = extract_data_from_html(&html);
        assert_eq!(data.caption.as_deref(), Some(shared.as_str()));
        assert_eq!(data.caption.unwrap().chars().count(), 400);
        assert_eq!(data.image.as_deref(), Some("https://cdn.example.com/og.jpg"));
    }

    #[test]
    fn test_meta_description_is_last_resort() {
        let html = r#"<html><head>
            <meta property="og:description" content="Tasty pancakes &amp; syrup">
            <meta name="twitter:image" content="https://cdn.example.com/tw.jpg">
        </head><body></body></html>"#;

        let data = extract_data_from_html(html);
        assert_eq!(data.caption.as_deref(), Some("Tasty pancakes & syrup"));
        assert_eq!(data.image.as_deref(), Some("https://cdn.example.com/tw.jpg"));
    }

    #[test]
    fn test_longest_script_caption_wins() {
        let short = "Short caption that still runs past the fifty character minimum.";
        let long = "Longer caption: 2 cups flour, 1 egg, 1 cup milk. Whisk together and fry in butter until golden.";
        let html = format!(
            r#"<html><body>
                <script>var a = {{"caption": "{short}"}};</script>
                <script>var b = {{"caption": "{long}", "display_url": "https:\/\/cdn.example.com\/x.jpg"}};</script>
                <script>var c = {{"caption": "too short"}};</script>
            </body></html>"#
        );

        let data = extract_data_from_html(&html);
        assert_eq!(data.caption.as_deref(), Some(long));
        assert_eq!(data.image.as_deref(), Some("https://cdn.example.com/x.jpg"));
    }

    #[test]
    fn test_json_ld_caption_and_escapes() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@type": "VideoObject", "caption": "Line one\nLine two é", "image": {"url": "https://cdn.example.com/ld.jpg"}}
            </script>
        </head></html>"#;

        let data = extract_data_from_html(html);
        assert_eq!(data.caption.as_deref(), Some("Line one\nLine two é"));
        assert_eq!(data.image.as_deref(), Some("https://cdn.example.com/ld.jpg"));
    }

    #[test]
    fn test_nothing_found() {
        let data = extract_data_from_html("<html><body><p>Log in</p></body></html>");
        assert_eq!(data, PageData::default());
    }

    #[test]
    fn test_longest_fold_keeps_first_on_tie() {
        let result = ["abc".to_string(), "xyz".to_string(), "ab".to_string()]
            .into_iter()
            .fold(None, longest);
        assert_eq!(result.as_deref(), Some("abc"));
    }
}
