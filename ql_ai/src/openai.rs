//! ABOUTME: OpenAI client implementation with authentication and retry logic
//! ABOUTME: Provides chat and image completions via the OpenAI API with proper error handling

use async_trait::async_trait;
use ql_core::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::{AiClient, AiConfig, ImageRequest, ImageResponse, TextRequest, TextResponse};

/// OpenAI API client with authentication and retry logic
pub struct OpenAiClient {
    client: Client,
    config: AiConfig,
    base_url: String,
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

/// OpenAI message format
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

/// OpenAI image generation request
#[derive(Debug, Serialize)]
struct ImagesRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: AiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        debug!("Created OpenAI client with base URL: {}", base_url);

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Execute a request with retry logic
    async fn execute_with_retry<T>(&self, request_builder: RequestBuilder) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * (1 << attempt.min(5))); // Exponential backoff
                debug!("Retrying request in {:?} (attempt {})", delay, attempt + 1);
                sleep(delay).await;
            }

            let request = match request_builder.try_clone() {
                Some(req) => req,
                None => {
                    error!("Failed to clone request for retry");
                    return Err(Error::Config(
                        "Unable to retry request - body not cloneable".to_string(),
                    ));
                }
            };

            match self.execute_request::<T>(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Request attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::External("All retry attempts failed".to_string())))
    }

    /// Execute a single HTTP request
    async fn execute_request<T>(&self, request: RequestBuilder) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request
            .send()
            .await
            .map_err(|e| Error::External(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::External(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| Error::External(format!("Failed to read response: {}", e)))?;

        serde_json::from_str::<T>(&response_text)
            .map_err(|e| Error::External(format!("Failed to parse OpenAI response: {}", e)))
    }

    /// Create authenticated request builder
    fn create_request(&self, endpoint: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        builder
    }

    fn require_key(&self) -> Result<()> {
        if self.config.api_key.is_none() {
            return Err(Error::Config("OpenAI API key not configured".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AiClient for OpenAiClient {
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse> {
        self.require_key()?;
        debug!("OpenAI client completing prompt of {} characters", request.prompt.len());

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt,
        });

        let chat = ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let request_builder = self.create_request("/chat/completions").json(&chat);
        let response: ChatResponse = self.execute_with_retry(request_builder).await?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::External("OpenAI returned an empty completion".to_string()))?;

        Ok(TextResponse {
            text,
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
            tokens_used: response.usage.map(|u| u.total_tokens),
        })
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse> {
        self.require_key()?;
        debug!("OpenAI client generating {} image", request.size);

        let images = ImagesRequest {
            model: self.config.image_model.clone(),
            prompt: request.prompt,
            n: 1,
            size: request.size,
        };

        let request_builder = self.create_request("/images/generations").json(&images);
        let response: ImagesResponse = self.execute_with_retry(request_builder).await?;

        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::External("OpenAI returned no image".to_string()))?;
        let url = image
            .url
            .ok_or_else(|| Error::External("OpenAI image has no URL".to_string()))?;

        Ok(ImageResponse {
            url,
            revised_prompt: image.revised_prompt,
        })
    }

    async fn health_check(&self) -> Result<()> {
        debug!("OpenAI client health check");
        self.require_key()?;

        // Simple test request to verify connectivity
        let test_request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            max_tokens: Some(1),
            temperature: 0.0,
        };

        let request_builder = self.create_request("/chat/completions").json(&test_request);
        let _: ChatResponse = self.execute_request(request_builder).await?;

        debug!("OpenAI client health check passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> AiConfig {
        AiConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some("https://api.openai.com/v1/".to_string()),
            timeout_seconds: 30,
            max_retries: 3,
            model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
            use_online: true,
        }
    }

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAiClient::new(create_test_config()).unwrap();
        assert_eq!(client.base_url, "https://api.openai.com/v1");
        assert_eq!(client.config.model, "gpt-4o-mini");
        assert_eq!(client.config.max_retries, 3);
    }

    #[test]
    fn test_default_base_url() {
        let config = AiConfig {
            base_url: None,
            ..create_test_config()
        };
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let config = AiConfig {
            api_key: None,
            ..create_test_config()
        };
        let client = OpenAiClient::new(config).unwrap();
        let err = client.generate_text(TextRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
