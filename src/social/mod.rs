//! Caption scraping for Instagram and Facebook posts.

mod caption;
mod facebook;
mod instagram;
mod share;

pub use caption::{extract_data_from_html, PageData, MIN_SCRIPT_CAPTION_LEN};
pub use share::{
    default_resolvers, find_post_id, is_share_url, resolve_share_url, AlternateAgents, BodyIdScan,
    EmbedPlugin, FollowRedirect, GuessedUrls, HeadRedirect, QueryVariants, ShareContext,
    ShareResolver,
};

use crate::fetchers::{HttpFetcher, DEFAULT_FETCH_TIMEOUT};
use crate::model::Platform;
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Caption text of a post plus its display image when one was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialCaption {
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

pub struct SocialCaptionScraper {
    fetcher: Arc<dyn HttpFetcher>,
    resolvers: Vec<Box<dyn ShareResolver>>,
    fetch_timeout: Duration,
}

impl SocialCaptionScraper {
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        SocialCaptionScraper {
            fetcher,
            resolvers: default_resolvers(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Resolves a Facebook share link. `None` means keep the original URL.
    pub async fn resolve_share_url(&self, url: &str) -> Option<String> {
        let context = ShareContext {
            fetcher: self.fetcher.as_ref(),
            url,
            fetch_timeout: self.fetch_timeout,
        };
        resolve_share_url(&self.resolvers, &context).await
    }

    /// Scrapes the caption of a post, detecting the platform from the URL.
    pub async fn scrape(&self, url: &str) -> Option<SocialCaption> {
        let platform = url::Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().and_then(Platform::from_host));
        match platform {
            Some(platform) => self.scrape_platform(url, platform).await,
            None => {
                debug!("{} is not an Instagram or Facebook URL", url);
                None
            }
        }
    }

    pub async fn scrape_platform(&self, url: &str, platform: Platform) -> Option<SocialCaption> {
        let fetcher = self.fetcher.as_ref();
        let result = match platform {
            Platform::Instagram => instagram::fetch_caption(fetcher, url, self.fetch_timeout).await,
            Platform::Facebook => facebook::fetch_caption(fetcher, url, self.fetch_timeout).await,
        };
        match &result {
            Some(found) => info!(
                "Scraped {} caption ({} chars)",
                platform.as_str(),
                found.caption.chars().count()
            ),
            None => debug!("No {} caption found for {}", platform.as_str(), url),
        }
        result
    }
}
