//! Resolution of Facebook `/share/r/<id>` links to canonical post URLs.
//!
//! Each [`ShareResolver`] is one independent attempt. A resolver that
//! errors or finds nothing never stops the next one from running.

use crate::error::ExtractError;
use crate::fetchers::{
    FetchRequest, HttpFetcher, RedirectPolicy, DESKTOP_CHROME, FACEBOOK_CRAWLER, MOBILE_SAFARI,
};
use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use url::Url;

static SHARE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"facebook\.com/share/(?:r|v|p)/([A-Za-z0-9_-]+)").unwrap());

/// JSON keys that may carry the numeric id of the shared post.
pub const ID_KEYS: &[&str] = &[
    "video_id",
    "post_id",
    "id",
    "target_id",
    "object_id",
    "story_id",
    "media_id",
    "content_id",
    "item_id",
];

/// Id patterns in priority order: for each key the quoted form, then
/// the bare numeric form.
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ID_KEYS
        .iter()
        .flat_map(|key| {
            [
                format!(r#""{key}"\s*:\s*"(\d{{5,}})""#),
                format!(r#""{key}"\s*:\s*(\d{{5,}})"#),
            ]
        })
        .map(|pattern| Regex::new(&pattern).unwrap())
        .collect()
});

static OG_URL_REEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?og:url[^>]*?content="[^"]*?/reel/(\d+)|<meta[^>]*?content="[^"]*?/reel/(\d+)[^"]*"[^>]*?og:url"#)
        .unwrap()
});

static LONG_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{10,})\b").unwrap());

/// Benign query strings that sometimes change how the share redirect behaves.
pub const QUERY_VARIANTS: &[&str] = &["ref=share", "ref=embed", "mibextid=wwXIfr", "ref=sharing"];

/// Guessed canonical paths for a share id, tried on each host.
pub const GUESSED_PATHS: &[&str] = &["reel/{id}", "posts/{id}", "videos/{id}", "watch/?v={id}"];
pub const GUESSED_HOSTS: &[&str] = &["www.facebook.com", "m.facebook.com"];

/// Whether `url` is a Facebook share link that needs resolving.
pub fn is_share_url(url: &str) -> bool {
    SHARE_URL_RE.is_match(url)
}

/// Everything a resolver needs for one attempt.
pub struct ShareContext<'a> {
    pub fetcher: &'a dyn HttpFetcher,
    pub url: &'a str,
    pub fetch_timeout: Duration,
}

impl ShareContext<'_> {
    fn get(&self, url: &str) -> FetchRequest {
        FetchRequest::get(url)
            .profile(&DESKTOP_CHROME)
            .timeout(self.fetch_timeout)
    }

    fn head_manual(&self, url: &str) -> FetchRequest {
        FetchRequest::head(url)
            .profile(&DESKTOP_CHROME)
            .redirect(RedirectPolicy::Manual)
            .timeout(self.fetch_timeout)
    }

    fn share_id(&self) -> Option<&str> {
        SHARE_URL_RE
            .captures(self.url)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }
}

#[async_trait]
pub trait ShareResolver: Send + Sync {
    fn name(&self) -> &'static str;
    async fn resolve(&self, context: &ShareContext<'_>) -> Result<Option<String>, ExtractError>;
}

/// All strategies in the order they are attempted.
pub fn default_resolvers() -> Vec<Box<dyn ShareResolver>> {
    vec![
        Box::new(HeadRedirect),
        Box::new(FollowRedirect),
        Box::new(BodyIdScan),
        Box::new(AlternateAgents),
        Box::new(EmbedPlugin),
        Box::new(QueryVariants),
        Box::new(GuessedUrls),
    ]
}

/// Runs `resolvers` in order and returns the first resolved URL.
pub async fn resolve_share_url(
    resolvers: &[Box<dyn ShareResolver>],
    context: &ShareContext<'_>,
) -> Option<String> {
    for resolver in resolvers {
        match resolver.resolve(context).await {
            Ok(Some(resolved)) => {
                info!("Resolved share URL via {}: {}", resolver.name(), resolved);
                return Some(resolved);
            }
            Ok(None) => debug!("Share resolver {} found nothing", resolver.name()),
            Err(e) => debug!("Share resolver {} failed: {}", resolver.name(), e),
        }
    }
    debug!("All share resolvers failed for {}", context.url);
    None
}

fn reel_url(id: &str) -> String {
    format!("https://www.facebook.com/reel/{id}")
}

/// Numeric post id from the id-key patterns or an `og:url` reel link.
pub fn find_post_id(body: &str) -> Option<String> {
    ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(body))
        .or_else(|| OG_URL_REEL_RE.captures(body))
        .and_then(|captures| captures.iter().skip(1).flatten().next())
        .map(|m| m.as_str().to_string())
}

/// HEAD without following redirects; a 3xx `Location` is the answer.
pub struct HeadRedirect;

#[async_trait]
impl ShareResolver for HeadRedirect {
    fn name(&self) -> &'static str {
        "head-redirect"
    }

    async fn resolve(&self, context: &ShareContext<'_>) -> Result<Option<String>, ExtractError> {
        let response = context.fetcher.fetch(context.head_manual(context.url)).await?;
        if !response.is_redirect() {
            return Ok(None);
        }
        let Some(location) = response.header("location") else {
            return Ok(None);
        };
        let base = Url::parse(context.url)
            .map_err(|e| ExtractError::ParseError(format!("invalid share URL: {e}")))?;
        Ok(base.join(location).ok().map(String::from))
    }
}

/// GET following redirects; accepts a different facebook.com URL.
pub struct FollowRedirect;

#[async_trait]
impl ShareResolver for FollowRedirect {
    fn name(&self) -> &'static str {
        "follow-redirect"
    }

    async fn resolve(&self, context: &ShareContext<'_>) -> Result<Option<String>, ExtractError> {
        let response = context.fetcher.fetch(context.get(context.url)).await?;
        let moved = response.final_url != context.url && response.final_url.contains("facebook.com");
        Ok(moved.then_some(response.final_url))
    }
}

/// Looks for the post id inside the share page itself.
pub struct BodyIdScan;

#[async_trait]
impl ShareResolver for BodyIdScan {
    fn name(&self) -> &'static str {
        "body-id-scan"
    }

    async fn resolve(&self, context: &ShareContext<'_>) -> Result<Option<String>, ExtractError> {
        let response = context.fetcher.fetch(context.get(context.url)).await?;
        if !response.is_success() {
            return Ok(None);
        }
        let id = find_post_id(&response.body).or_else(|| {
            LONG_NUMBER_RE
                .captures(&response.body)
                .map(|captures| captures[1].to_string())
        });
        Ok(id.as_deref().map(reel_url))
    }
}

/// Mobile browser then Facebook's own crawler; some agents get the
/// redirect when desktop browsers don't.
pub struct AlternateAgents;

#[async_trait]
impl ShareResolver for AlternateAgents {
    fn name(&self) -> &'static str {
        "alternate-agents"
    }

    async fn resolve(&self, context: &ShareContext<'_>) -> Result<Option<String>, ExtractError> {
        for profile in [&MOBILE_SAFARI, &FACEBOOK_CRAWLER] {
            let request = FetchRequest::get(context.url)
                .profile(profile)
                .timeout(context.fetch_timeout);
            match context.fetcher.fetch(request).await {
                Ok(response)
                    if response.final_url != context.url && response.final_url.contains("/reel/") =>
                {
                    return Ok(Some(response.final_url));
                }
                Ok(_) => {}
                Err(e) => debug!("{} agent failed: {}", profile.name, e),
            }
        }
        Ok(None)
    }
}

/// The video embed plugin page often names the post id.
pub struct EmbedPlugin;

#[async_trait]
impl ShareResolver for EmbedPlugin {
    fn name(&self) -> &'static str {
        "embed-plugin"
    }

    async fn resolve(&self, context: &ShareContext<'_>) -> Result<Option<String>, ExtractError> {
        let embed = Url::parse_with_params(
            "https://www.facebook.com/plugins/video.php",
            &[("href", context.url)],
        )
        .map_err(|e| ExtractError::ParseError(e.to_string()))?;
        let response = context.fetcher.fetch(context.get(embed.as_str())).await?;
        if !response.is_success() {
            return Ok(None);
        }
        Ok(find_post_id(&response.body).as_deref().map(reel_url))
    }
}

/// Retries the share link with referrer-style query strings.
pub struct QueryVariants;

#[async_trait]
impl ShareResolver for QueryVariants {
    fn name(&self) -> &'static str {
        "query-variants"
    }

    async fn resolve(&self, context: &ShareContext<'_>) -> Result<Option<String>, ExtractError> {
        let separator = if context.url.contains('?') { '&' } else { '?' };
        for variant in QUERY_VARIANTS {
            let candidate = format!("{}{}{}", context.url, separator, variant);
            match context.fetcher.fetch(context.get(&candidate)).await {
                Ok(response)
                    if response.final_url != candidate
                        && (response.final_url.contains("/reel/")
                            || response.final_url.contains("/videos/")) =>
                {
                    return Ok(Some(response.final_url));
                }
                Ok(_) => {}
                Err(e) => debug!("query variant {} failed: {}", variant, e),
            }
        }
        Ok(None)
    }
}

/// Probes canonical paths built from the share id itself.
pub struct GuessedUrls;

#[async_trait]
impl ShareResolver for GuessedUrls {
    fn name(&self) -> &'static str {
        "guessed-urls"
    }

    async fn resolve(&self, context: &ShareContext<'_>) -> Result<Option<String>, ExtractError> {
        let Some(id) = context.share_id() else {
            return Ok(None);
        };
        let candidates = GUESSED_HOSTS.iter().flat_map(|host| {
            GUESSED_PATHS
                .iter()
                .map(move |path| format!("https://{}/{}", host, path.replace("{id}", id)))
        }).collect::<Vec<String>>();

        for candidate in candidates {
            match context.fetcher.fetch(context.head_manual(&candidate)).await {
                Ok(response) if response.status == 200 || response.is_redirect() => {
                    return Ok(Some(candidate));
                }
                Ok(_) => {}
                Err(e) => debug!("guessed url {} failed: {}", candidate, e),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::mock::MockFetcher;
    use crate::fetchers::Method;

    const SHARE: &str = "https://www.facebook.com/share/r/1AbCdEf/";

    async fn resolve_with(fetcher: &MockFetcher) -> Option<String> {
        let context = ShareContext {
            fetcher,
            url: SHARE,
            fetch_timeout: Duration::from_secs(5),
        };
        resolve_share_url(&default_resolvers(), &context).await
    }

    #[test]
    fn test_is_share_url() {
        assert!(is_share_url(SHARE));
        assert!(is_share_url("https://m.facebook.com/share/v/xyz123"));
        assert!(!is_share_url("https://www.facebook.com/reel/12345"));
    }

    #[tokio::test]
    async fn test_head_redirect_short_circuits() {
        let fetcher = MockFetcher::new().redirect(
            Method::Head,
            SHARE,
            301,
            "https://www.facebook.com/reel/12345",
        );

        let resolved = resolve_with(&fetcher).await;
        assert_eq!(resolved.as_deref(), Some("https://www.facebook.com/reel/12345"));
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_relative_location_is_joined() {
        let fetcher = MockFetcher::new().redirect(Method::Head, SHARE, 302, "/reel/777");
        let resolved = resolve_with(&fetcher).await;
        assert_eq!(resolved.as_deref(), Some("https://www.facebook.com/reel/777"));
    }

    #[tokio::test]
    async fn test_body_id_scan_builds_reel_url() {
        let fetcher = MockFetcher::new().route(
            Method::Get,
            SHARE,
            200,
            r#"<script>{"props": {"video_id": "987654321", "id": 1}}</script>"#,
        );

        let resolved = resolve_with(&fetcher).await;
        assert_eq!(resolved.as_deref(), Some("https://www.facebook.com/reel/987654321"));
    }

    #[tokio::test]
    async fn test_crawler_agent_lands_on_reel() {
        let fetcher = MockFetcher::new();
        let context = ShareContext {
            fetcher: &fetcher,
            url: SHARE,
            fetch_timeout: Duration::from_secs(5),
        };
        assert_eq!(AlternateAgents.resolve(&context).await.unwrap(), None);

        let fetcher = MockFetcher::new().lands_on(SHARE, "https://www.facebook.com/reel/4242", "");
        let context = ShareContext {
            fetcher: &fetcher,
            url: SHARE,
            fetch_timeout: Duration::from_secs(5),
        };
        assert_eq!(
            AlternateAgents.resolve(&context).await.unwrap().as_deref(),
            Some("https://www.facebook.com/reel/4242")
        );
    }

    #[tokio::test]
    async fn test_guessed_urls_are_last_resort() {
        let fetcher = MockFetcher::new().route(
            Method::Head,
            "https://m.facebook.com/posts/1AbCdEf",
            200,
            "",
        );

        let resolved = resolve_with(&fetcher).await;
        assert_eq!(resolved.as_deref(), Some("https://m.facebook.com/posts/1AbCdEf"));
        let urls = fetcher.requested_urls();
        assert!(urls.iter().any(|u| u.contains("plugins/video.php")));
        assert!(urls.iter().any(|u| u.ends_with("?ref=sharing")));
    }

    #[tokio::test]
    async fn test_all_resolvers_fail() {
        let fetcher = MockFetcher::new();
        assert_eq!(resolve_with(&fetcher).await, None);
    }

    #[test]
    fn test_find_post_id_prefers_key_order() {
        let body = r#"{"id": "11111111", "video_id": 22222222}"#;
        assert_eq!(find_post_id(body).as_deref(), Some("22222222"));

        let og = r#"<meta property="og:url" content="https://www.facebook.com/reel/5550001/" />"#;
        assert_eq!(find_post_id(og).as_deref(), Some("5550001"));
        assert_eq!(find_post_id("nothing here"), None);
    }
}
