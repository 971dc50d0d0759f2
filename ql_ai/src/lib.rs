//! ABOUTME: AI client abstraction with OpenAI and stub implementations
//! ABOUTME: Provides text and image completions and the post generator built on them

use async_trait::async_trait;
use ql_core::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod generator;
#[cfg(feature = "ai_online")]
pub mod openai;
pub mod stub;

pub use generator::{ContentGenerator, FeaturedImage, GeneratedPost};
#[cfg(feature = "ai_online")]
pub use openai::OpenAiClient;
pub use stub::StubClient;

/// Request for a text completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
    /// Optional system instruction sent ahead of the prompt
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens: None,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a text completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResponse {
    pub text: String,
    pub model: String,
    pub tokens_used: Option<u32>,
}

/// Request for an image generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    /// e.g. "1024x1024"
    pub size: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: "1024x1024".to_string(),
        }
    }
}

/// Response from an image generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    pub url: String,
    pub revised_prompt: Option<String>,
}

/// Configuration for AI clients
#[derive(Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// API key for online services
    pub api_key: Option<String>,
    /// Base URL for API (defaults to OpenAI)
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum retries for failed requests
    pub max_retries: u32,
    /// Chat model used for titles and content
    pub model: String,
    /// Image model used for featured images
    pub image_model: String,
    /// Whether to use online AI services
    pub use_online: bool,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .field("use_online", &self.use_online)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_seconds: 60,
            max_retries: 3,
            model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
            use_online: false, // Default to stub for safety
        }
    }
}

/// Trait for AI client implementations
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Complete a text prompt
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse>;

    /// Generate an image and return where it can be fetched
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse>;

    /// Health check for the AI service
    async fn health_check(&self) -> Result<()>;
}

/// Create an AI client based on configuration
pub fn create_client(config: AiConfig) -> Result<Box<dyn AiClient>> {
    if config.use_online {
        #[cfg(feature = "ai_online")]
        {
            tracing::info!("Creating OpenAI client with model: {}", config.model);
            Ok(Box::new(OpenAiClient::new(config)?))
        }
        #[cfg(not(feature = "ai_online"))]
        {
            tracing::warn!("Online AI requested but ai_online feature not enabled, falling back to stub");
            Ok(Box::new(StubClient::new()))
        }
    } else {
        debug!("Creating stub AI client");
        Ok(Box::new(StubClient::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_config_default() {
        let config = AiConfig::default();
        assert!(!config.use_online);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.image_model, "dall-e-3");
        assert_eq!(config.max_retries, 3);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_ai_config_debug_redacts_key() {
        let config = AiConfig {
            api_key: Some("sk-very-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_text_request_builder() {
        let request = TextRequest::new("Write a haiku")
            .with_system("You are terse.")
            .with_max_tokens(64);
        assert_eq!(request.system.as_deref(), Some("You are terse."));
        assert_eq!(request.max_tokens, Some(64));
    }

    #[tokio::test]
    async fn test_create_client_stub_default() {
        let client = create_client(AiConfig::default()).unwrap();
        assert!(client.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_create_client_online_behavior() {
        let config = AiConfig {
            use_online: true,
            ..Default::default()
        };

        let client = create_client(config).unwrap();

        #[cfg(feature = "ai_online")]
        {
            // Without an API key the online client refuses to run
            assert!(client.health_check().await.is_err());
        }

        #[cfg(not(feature = "ai_online"))]
        {
            assert!(client.health_check().await.is_ok());
        }
    }
}
