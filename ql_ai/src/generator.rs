//! ABOUTME: Content generator turning a generation context into a finished post
//! ABOUTME: Reads only the context trait, so every context variant is handled the same way

use crate::{AiClient, ImageRequest, TextRequest};
use ql_context::{ContextRecord, FeaturedImageSource, GenerationContext, PostStatus};
use ql_core::{Error, MonotonicTimer, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TOPIC_PLACEHOLDER: &str = "{{topic}}";
const TITLE_MAX_TOKENS: u32 = 60;

/// Featured image chosen for a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FeaturedImage {
    /// Generated by the AI service
    AiPrompt { url: String, prompt: String },
    /// To be fetched from Unsplash by keywords
    Unsplash { keywords: String },
    /// An existing media library item
    MediaLibrary { media_id: String },
}

/// A generated post ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub article_structure_id: Option<String>,
    pub featured_image: Option<FeaturedImage>,
    /// Snapshot of the context this post came from
    pub context: ContextRecord,
}

/// Generates titles, bodies and featured images through an [`AiClient`]
#[derive(Clone)]
pub struct ContentGenerator {
    client: Arc<dyn AiClient>,
}

fn resolve_topic(text: &str, topic: &str) -> String {
    text.replace(TOPIC_PLACEHOLDER, topic)
}

/// Strip the quotes and "Title:" prefixes models like to add
fn clean_title(raw: &str) -> String {
    let line = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    let line = line
        .strip_prefix("Title:")
        .or_else(|| line.strip_prefix("title:"))
        .unwrap_or(line)
        .trim();
    line.trim_matches(|c| c == '"' || c == '\'' || c == '*').trim().to_string()
}

impl ContentGenerator {
    pub fn new(client: Arc<dyn AiClient>) -> Self {
        Self { client }
    }

    /// Generate a complete post for `ctx`.
    ///
    /// Title and content failures fail the attempt; a failed featured image
    /// only leaves the post without one.
    pub async fn generate(&self, ctx: &dyn GenerationContext) -> Result<GeneratedPost> {
        let timer = MonotonicTimer::new();
        let topic = ctx.topic().unwrap_or_else(|| ctx.name());

        let content = self.generate_content(ctx, &topic).await?;
        let title = self.generate_title(ctx, &topic).await?;
        let featured_image = self.featured_image(ctx, &topic, &title).await;

        info!(
            context_type = %ctx.kind(),
            context_id = %ctx.id(),
            elapsed_ms = timer.elapsed_ms(),
            has_image = featured_image.is_some(),
            "Generated post"
        );

        Ok(GeneratedPost {
            title,
            content,
            status: ctx.post_status(),
            category: ctx.post_category(),
            tags: ctx.post_tags(),
            author: ctx.post_author(),
            article_structure_id: ctx.article_structure_id(),
            featured_image,
            context: ctx.to_record(),
        })
    }

    /// Content prompt with the topic resolved and any voice instructions in front
    pub fn build_content_prompt(ctx: &dyn GenerationContext, topic: &str) -> String {
        let prompt = resolve_topic(&ctx.content_prompt(), topic);
        match ctx.voice().map(|v| v.content_instructions.trim()) {
            Some(instructions) if !instructions.is_empty() => {
                format!("{}\n\n{}", resolve_topic(instructions, topic), prompt)
            }
            _ => prompt,
        }
    }

    async fn generate_content(&self, ctx: &dyn GenerationContext, topic: &str) -> Result<String> {
        let prompt = Self::build_content_prompt(ctx, topic);
        debug!(context_id = %ctx.id(), prompt_len = prompt.len(), "Requesting content");

        let response = self.client.generate_text(TextRequest::new(prompt)).await?;
        let content = response.text.trim().to_string();
        if content.is_empty() {
            return Err(Error::External("AI returned empty content".to_string()));
        }
        Ok(content)
    }

    async fn generate_title(&self, ctx: &dyn GenerationContext, topic: &str) -> Result<String> {
        let title_prompt = resolve_topic(&ctx.title_prompt(), topic);
        let prompt = if title_prompt.trim().is_empty() {
            format!("Write a title for a blog post about: {}", topic)
        } else {
            title_prompt
        };

        let request = TextRequest::new(prompt)
            .with_system("Reply with a single blog post title and nothing else.")
            .with_max_tokens(TITLE_MAX_TOKENS);
        let response = self.client.generate_text(request).await?;

        let title = clean_title(&response.text);
        if title.is_empty() {
            return Err(Error::External("AI returned an empty title".to_string()));
        }
        Ok(title)
    }

    async fn featured_image(
        &self,
        ctx: &dyn GenerationContext,
        topic: &str,
        title: &str,
    ) -> Option<FeaturedImage> {
        if !ctx.should_generate_featured_image() {
            return None;
        }

        match ctx.featured_image_source() {
            FeaturedImageSource::AiPrompt => {
                let prompt = ctx
                    .image_prompt()
                    .map(|p| resolve_topic(&p, topic))
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| title.to_string());
                match self.client.generate_image(ImageRequest::new(prompt.clone())).await {
                    Ok(image) => Some(FeaturedImage::AiPrompt {
                        url: image.url,
                        prompt,
                    }),
                    Err(e) => {
                        warn!(context_id = %ctx.id(), error = %e, "Featured image generation failed");
                        None
                    }
                }
            }
            FeaturedImageSource::Unsplash => {
                let keywords = ctx.unsplash_keywords();
                let keywords = if keywords.trim().is_empty() {
                    topic.to_string()
                } else {
                    resolve_topic(&keywords, topic)
                };
                Some(FeaturedImage::Unsplash { keywords })
            }
            FeaturedImageSource::MediaLibrary => match ctx.media_library_ids().into_iter().next() {
                Some(media_id) => Some(FeaturedImage::MediaLibrary { media_id }),
                None => {
                    warn!(context_id = %ctx.id(), "Media library image requested but no ids configured");
                    None
                }
            },
        }
    }
}
