use super::{FetchRequest, FetchResponse, HttpFetcher, Method, RedirectPolicy};
use crate::error::ExtractError;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;

/// `reqwest`-backed fetcher. Redirect policy is fixed per client, so one
/// client is kept for each policy.
pub struct ReqwestFetcher {
    follow: Client,
    manual: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, ExtractError> {
        let follow = Client::builder().redirect(Policy::limited(10)).build()?;
        let manual = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { follow, manual })
    }

    fn header_map(request: &FetchRequest) -> Result<HeaderMap, ExtractError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ExtractError::ParseError(format!("bad header name {name}: {e}")))?;
            headers.insert(name, HeaderValue::from_str(value)?);
        }
        Ok(headers)
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ExtractError> {
        let client = match request.redirect {
            RedirectPolicy::Follow => &self.follow,
            RedirectPolicy::Manual => &self.manual,
        };
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
        };

        debug!("{:?} {} ({:?})", request.method, request.url, request.redirect);

        let response = client
            .request(method, &request.url)
            .headers(Self::header_map(&request)?)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractError::Timeout
                } else {
                    ExtractError::FetchError(e)
                }
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = match request.method {
            Method::Head => String::new(),
            Method::Get => response.text().await?,
        };

        Ok(FetchResponse {
            status,
            headers,
            final_url,
            body,
        })
    }
}
