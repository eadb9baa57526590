#![allow(dead_code)]

use async_trait::async_trait;
use recipe_extract::error::ExtractError;
use recipe_extract::fetchers::Method;
use recipe_extract::{CompletionService, FetchRequest, FetchResponse, HttpFetcher};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Serves canned pages by URL; everything else is a 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, FetchResponse>,
    pub requests: Mutex<Vec<(Method, String)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchResponse {
                status: 200,
                final_url: url.to_string(),
                body: body.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchResponse {
                status,
                final_url: url.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub fn redirect(mut self, url: &str, location: &str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("location".to_string(), location.to_string());
        self.pages.insert(
            url.to_string(),
            FetchResponse {
                status: 301,
                headers,
                final_url: url.to_string(),
                body: String::new(),
            },
        );
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }
}

#[async_trait]
impl HttpFetcher for ScriptedFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ExtractError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.method, request.url.clone()));
        Ok(self.pages.get(&request.url).cloned().unwrap_or_else(|| FetchResponse {
            status: 404,
            final_url: request.url.clone(),
            ..Default::default()
        }))
    }
}

/// A fetcher whose requests never complete.
pub struct HangingFetcher;

#[async_trait]
impl HttpFetcher for HangingFetcher {
    async fn fetch(&self, _request: FetchRequest) -> Result<FetchResponse, ExtractError> {
        std::future::pending().await
    }
}

/// Answers prompts from a queue and records what it was asked.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(replies: &[&str]) -> Self {
        ScriptedCompletion {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ExtractError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ExtractError::CompletionError("no scripted reply left".into()))
    }
}

/// A minimal post page exposing `caption` as its `og:description`.
pub fn caption_page(caption: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
        <html>
        <head>
            <meta property="og:description" content="{caption}">
        </head>
        <body></body>
        </html>"#
    )
}

pub fn recipe_page(json_ld: &str) -> String {
    format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Recipe Page</title>
            <script type="application/ld+json">
                {json_ld}
            </script>
        </head>
        <body>
            <h1>Recipe</h1>
        </body>
        </html>
        "#
    )
}
