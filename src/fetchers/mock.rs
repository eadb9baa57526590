//! Scripted in-memory fetcher for unit tests.

use super::{FetchRequest, FetchResponse, HttpFetcher, Method};
use crate::error::ExtractError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockFetcher {
    routes: Vec<(Method, String, FetchResponse)>,
    pub calls: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: Method, url: &str, status: u16, body: &str) -> Self {
        self.routes.push((
            method,
            url.to_string(),
            FetchResponse {
                status,
                headers: HashMap::new(),
                final_url: url.to_string(),
                body: body.to_string(),
            },
        ));
        self
    }

    pub fn redirect(mut self, method: Method, url: &str, status: u16, location: &str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("location".to_string(), location.to_string());
        self.routes.push((
            method,
            url.to_string(),
            FetchResponse {
                status,
                headers,
                final_url: url.to_string(),
                body: String::new(),
            },
        ));
        self
    }

    /// A followed GET that lands on `final_url`.
    pub fn lands_on(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.routes.push((
            Method::Get,
            url.to_string(),
            FetchResponse {
                status: 200,
                headers: HashMap::new(),
                final_url: final_url.to_string(),
                body: body.to_string(),
            },
        ));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|r| r.url.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ExtractError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let found = self
            .routes
            .iter()
            .find(|(method, url, _)| *method == request.method && *url == request.url)
            .map(|(_, _, response)| response.clone());
        Ok(found.unwrap_or_else(|| FetchResponse {
            status: 404,
            final_url: request.url.clone(),
            ..Default::default()
        }))
    }
}
