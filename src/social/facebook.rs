use super::SocialCaption;
use crate::entities::clean_escaped_text;
use crate::fetchers::{FetchRequest, HeaderProfile, HttpFetcher, DESKTOP_CHROME, MOBILE_SAFARI};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Facebook captions at or below this length are treated as noise.
const MIN_CAPTION_LEN: usize = 50;

/// Ten caption sources, from structured JSON strings down to `<title>`.
static CAPTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    const STRING: &str = r#""((?:[^"\\]|\\.)*)""#;
    [
        format!(r#""message"\s*:\s*\{{\s*"text"\s*:\s*{STRING}"#),
        format!(r#"(?s)"(?:creation_story|story)"\s*:\s*\{{.{{0,600}}?"text"\s*:\s*{STRING}"#),
        format!(r#""description"\s*:\s*{STRING}"#),
        format!(r#""caption"\s*:\s*{STRING}"#),
        format!(r#""title"\s*:\s*\{{\s*"text"\s*:\s*{STRING}"#),
        meta_pattern("og:description"),
        meta_pattern("twitter:description"),
        meta_pattern("description"),
        meta_pattern("og:title"),
        r"(?is)<title[^>]*>(.*?)</title>".to_string(),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static IMAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["og:image", "twitter:image"]
        .iter()
        .map(|key| Regex::new(&meta_pattern(key)).unwrap())
        .collect()
});

/// Markers of login walls and generic page chrome.
pub const BOILERPLATE_MARKERS: &[&str] = &[
    "log in or sign up",
    "log into facebook",
    "you must log in",
    "see posts, photos and more on facebook",
    "facebook helps you connect",
    "this content isn't available",
];

static POST_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/reel/(\d+)",
        r"/videos/(?:[^/?]+/)?(\d+)",
        r"/watch/?\?v=(\d+)",
        r"story_fbid=(\d+)",
        r"/posts/([A-Za-z0-9]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

fn meta_pattern(key: &str) -> String {
    format!(r#"(?i)<meta[^>]*?(?:property|name)="{key}"[^>]*?content="([^"]*)""#)
}

/// Numeric (or slug) id of a post URL.
pub fn post_id(url: &str) -> Option<String> {
    POST_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .map(|captures| captures[1].to_string())
}

fn is_boilerplate(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower == "facebook" || lower == "log in" || BOILERPLATE_MARKERS.iter().any(|m| lower.contains(m))
}

/// First caption candidate that is long enough and not page chrome.
pub fn extract_caption(html: &str) -> Option<String> {
    CAPTION_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(html))
        .map(|captures| clean_escaped_text(&captures[1]))
        .find(|text| text.chars().count() > MIN_CAPTION_LEN && !is_boilerplate(text))
}

pub fn extract_image(html: &str) -> Option<String> {
    IMAGE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(html))
        .map(|captures| clean_escaped_text(&captures[1]))
        .filter(|url| !url.is_empty())
}

fn variants(url: &str) -> Vec<(String, &'static HeaderProfile)> {
    match post_id(url) {
        Some(id) => vec![
            (format!("https://www.facebook.com/reel/{id}"), &DESKTOP_CHROME),
            (format!("https://m.facebook.com/reel/{id}"), &MOBILE_SAFARI),
            (format!("https://www.facebook.com/posts/{id}"), &DESKTOP_CHROME),
        ],
        None => vec![
            (url.to_string(), &DESKTOP_CHROME),
            (url.replacen("://www.", "://m.", 1), &MOBILE_SAFARI),
        ],
    }
}

pub(crate) async fn fetch_caption(
    fetcher: &dyn HttpFetcher,
    url: &str,
    fetch_timeout: Duration,
) -> Option<SocialCaption> {
    for (variant, profile) in variants(url) {
        let request = FetchRequest::get(&variant)
            .profile(profile)
            .timeout(fetch_timeout);
        let response = match fetcher.fetch(request).await {
            Ok(response) if response.status == 200 => response,
            Ok(response) => {
                debug!("Facebook variant {} answered {}", variant, response.status);
                continue;
            }
            Err(e) => {
                debug!("Facebook variant {} failed: {}", variant, e);
                continue;
            }
        };

        if let Some(caption) = extract_caption(&response.body) {
            debug!("Facebook caption found via {} ({})", variant, profile.name);
            return Some(SocialCaption {
                caption,
                image: extract_image(&response.body),
            });
        }
    }
    None
}
