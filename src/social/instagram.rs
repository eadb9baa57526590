use super::caption::extract_data_from_html;
use super::SocialCaption;
use crate::fetchers::{FetchRequest, HttpFetcher, DESKTOP_CHROME};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static SHORTCODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:instagram\.com|instagr\.am)/(?:[A-Za-z0-9_.]+/)?(?:p|reel|reels|tv)/([A-Za-z0-9_-]+)")
        .unwrap()
});

pub fn shortcode(url: &str) -> Option<&str> {
    SHORTCODE_RE
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Pages to try, cheapest and least guarded first.
fn candidate_urls(url: &str) -> Vec<String> {
    let mut urls: Vec<String> = match shortcode(url) {
        Some(code) => vec![
            format!("https://www.instagram.com/p/{code}/embed/captioned/"),
            format!("https://www.instagram.com/p/{code}/"),
            format!("https://www.instagram.com/reel/{code}/"),
            format!("https://www.instagram.com/tv/{code}/"),
        ],
        None => Vec::new(),
    };
    if !urls.iter().any(|candidate| candidate == url) {
        urls.push(url.to_string());
    }
    urls
}

pub(crate) async fn fetch_caption(
    fetcher: &dyn HttpFetcher,
    url: &str,
    fetch_timeout: Duration,
) -> Option<SocialCaption> {
    let mut image = None;

    for candidate in candidate_urls(url) {
        let request = FetchRequest::get(&candidate)
            .profile(&DESKTOP_CHROME)
            .timeout(fetch_timeout);
        let response = match fetcher.fetch(request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                debug!("Instagram page {} answered {}", candidate, response.status);
                continue;
            }
            Err(e) => {
                debug!("Instagram page {} failed: {}", candidate, e);
                continue;
            }
        };

        let data = extract_data_from_html(&response.body);
        image = image.or(data.image);
        if let Some(caption) = data.caption {
            debug!("Instagram caption found via {}", candidate);
            return Some(SocialCaption { caption, image });
        }
    }
    None
}
