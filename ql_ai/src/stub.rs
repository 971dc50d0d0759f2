//! ABOUTME: Stub AI client that returns canned responses for testing
//! ABOUTME: No network calls, deterministic responses for CI/development

use async_trait::async_trait;
use ql_core::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::{AiClient, ImageRequest, ImageResponse, TextRequest, TextResponse};

const STUB_MODEL: &str = "stub";

/// Stub AI client that returns predetermined responses
pub struct StubClient {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StubClient {
    pub fn new() -> Self {
        debug!("Creating stub AI client");
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A stub whose completions all fail with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Completions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(Error::External(message.clone())),
            None => Ok(()),
        }
    }

    /// Deterministic text derived from the prompt's first line
    fn stub_text(prompt: &str) -> String {
        let first_line = prompt.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let words: Vec<&str> = first_line.split_whitespace().take(12).collect();
        if words.is_empty() {
            return "Untitled".to_string();
        }
        words.join(" ")
    }

    fn slug(text: &str) -> String {
        let slug: String = text
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let parts: Vec<&str> = slug.split('-').filter(|p| !p.is_empty()).take(8).collect();
        if parts.is_empty() {
            "image".to_string()
        } else {
            parts.join("-")
        }
    }
}

impl Default for StubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiClient for StubClient {
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse> {
        debug!("Stub client completing prompt of {} characters", request.prompt.len());
        self.check()?;

        let text = if request.max_tokens.map(|t| t <= 64).unwrap_or(false) {
            Self::stub_text(&request.prompt)
        } else {
            format!(
                "{}\n\n{}",
                Self::stub_text(&request.prompt),
                "This post was produced by the stub AI client."
            )
        };

        Ok(TextResponse {
            tokens_used: Some(text.split_whitespace().count() as u32),
            text,
            model: STUB_MODEL.to_string(),
        })
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse> {
        debug!("Stub client generating image for prompt of {} characters", request.prompt.len());
        self.check()?;

        Ok(ImageResponse {
            url: format!("stub://images/{}.png", Self::slug(&request.prompt)),
            revised_prompt: None,
        })
    }

    async fn health_check(&self) -> Result<()> {
        debug!("Stub client health check");
        match &self.failure {
            Some(message) => Err(Error::External(message.clone())),
            None => Ok(()),
        }
    }
}
