//! HTTP fetching used by the social scrapers and the web page path.

#[cfg(test)]
pub(crate) mod mock;
mod profiles;
mod request;

pub use profiles::{HeaderProfile, DESKTOP_CHROME, FACEBOOK_CRAWLER, MOBILE_SAFARI};
pub use request::ReqwestFetcher;

use crate::error::ExtractError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Default per-request timeout, well inside the pipeline budget.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Return 3xx responses as-is
    Manual,
    Follow,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub redirect: RedirectPolicy,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        FetchRequest {
            url: url.into(),
            method: Method::Get,
            headers: Vec::new(),
            redirect: RedirectPolicy::Follow,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn head(url: impl Into<String>) -> Self {
        FetchRequest {
            method: Method::Head,
            ..FetchRequest::get(url)
        }
    }

    pub fn profile(mut self, profile: &HeaderProfile) -> Self {
        self.headers = profile.headers();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn redirect(mut self, redirect: RedirectPolicy) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub final_url: String,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Performs a single HTTP request. Implementations report transport
/// failures as errors; any status code is a successful fetch.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ExtractError>;
}
