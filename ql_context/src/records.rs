//! ABOUTME: Backing records a generation context is built from
//! ABOUTME: Templates, voices, authors and their topics, with optional fields made explicit

use chrono::NaiveDateTime;
use ql_core::{Error, Id};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where a post's featured image comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturedImageSource {
    #[default]
    AiPrompt,
    Unsplash,
    MediaLibrary,
}

impl FeaturedImageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeaturedImageSource::AiPrompt => "ai_prompt",
            FeaturedImageSource::Unsplash => "unsplash",
            FeaturedImageSource::MediaLibrary => "media_library",
        }
    }
}

impl std::fmt::Display for FeaturedImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeaturedImageSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai_prompt" => Ok(FeaturedImageSource::AiPrompt),
            "unsplash" => Ok(FeaturedImageSource::Unsplash),
            "media_library" => Ok(FeaturedImageSource::MediaLibrary),
            other => Err(Error::Validation(format!(
                "Unknown featured image source '{}'",
                other
            ))),
        }
    }
}

/// Status the generated post is created with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Pending,
    Publish,
    Private,
    Future,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Publish => "publish",
            PostStatus::Private => "private",
            PostStatus::Future => "future",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "pending" => Ok(PostStatus::Pending),
            "publish" => Ok(PostStatus::Publish),
            "private" => Ok(PostStatus::Private),
            "future" => Ok(PostStatus::Future),
            other => Err(Error::Validation(format!("Unknown post status '{}'", other))),
        }
    }
}

/// Review state of an author topic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    /// A post has been generated from it
    Used,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Pending => "pending",
            TopicStatus::Approved => "approved",
            TopicStatus::Rejected => "rejected",
            TopicStatus::Used => "used",
        }
    }
}

impl std::fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TopicStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TopicStatus::Pending),
            "approved" => Ok(TopicStatus::Approved),
            "rejected" => Ok(TopicStatus::Rejected),
            "used" => Ok(TopicStatus::Used),
            other => Err(Error::Validation(format!("Unknown topic status '{}'", other))),
        }
    }
}

/// Split a comma separated list, dropping blanks
pub fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// A reusable generation recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    /// Content prompt; may contain `{{topic}}`
    pub prompt_template: String,
    pub title_prompt: Option<String>,
    pub voice_id: Option<String>,
    pub post_quantity: u32,
    pub image_prompt: Option<String>,
    pub generate_featured_image: bool,
    pub featured_image_source: Option<FeaturedImageSource>,
    pub unsplash_keywords: Option<String>,
    /// Comma separated media library ids
    pub media_ids: Option<String>,
    pub post_status: PostStatus,
    pub post_category: Option<String>,
    /// Comma separated tags
    pub post_tags: Option<String>,
    pub post_author: Option<String>,
    pub article_structure_id: Option<String>,
    pub is_active: bool,
}

impl Template {
    pub fn new(name: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            id: Id::new().to_string(),
            name: name.into(),
            prompt_template: prompt_template.into(),
            title_prompt: None,
            voice_id: None,
            post_quantity: 1,
            image_prompt: None,
            generate_featured_image: false,
            featured_image_source: None,
            unsplash_keywords: None,
            media_ids: None,
            post_status: PostStatus::Draft,
            post_category: None,
            post_tags: None,
            post_author: None,
            article_structure_id: None,
            is_active: true,
        }
    }
}

/// Tone and style overrides attached to a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub title_prompt: String,
    pub content_instructions: String,
    pub excerpt_instructions: Option<String>,
    pub is_active: bool,
}

impl Voice {
    pub fn new(
        name: impl Into<String>,
        title_prompt: impl Into<String>,
        content_instructions: impl Into<String>,
    ) -> Self {
        Self {
            id: Id::new().to_string(),
            name: name.into(),
            title_prompt: title_prompt.into(),
            content_instructions: content_instructions.into(),
            excerpt_instructions: None,
            is_active: true,
        }
    }
}

/// A persona that writes about a niche from its approved topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub field_niche: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub article_structure_id: Option<String>,
    pub post_generation_frequency: String,
    pub post_generation_next_run: Option<NaiveDateTime>,
    pub post_generation_last_run: Option<NaiveDateTime>,
    pub post_status: PostStatus,
    pub post_category: Option<String>,
    pub post_tags: Option<String>,
    pub post_author: Option<String>,
    pub generate_featured_image: bool,
    pub featured_image_source: Option<FeaturedImageSource>,
    pub is_active: bool,
}

impl Author {
    pub fn new(name: impl Into<String>, field_niche: impl Into<String>) -> Self {
        Self {
            id: Id::new().to_string(),
            name: name.into(),
            field_niche: field_niche.into(),
            description: None,
            keywords: None,
            article_structure_id: None,
            post_generation_frequency: "daily".to_string(),
            post_generation_next_run: None,
            post_generation_last_run: None,
            post_status: PostStatus::Draft,
            post_category: None,
            post_tags: None,
            post_author: None,
            generate_featured_image: false,
            featured_image_source: None,
            is_active: true,
        }
    }
}

/// A subject proposed for an author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub prompt: Option<String>,
    pub status: TopicStatus,
    /// Sampling weight; higher is picked more often
    pub score: i64,
}

impl Topic {
    pub fn new(author_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Id::new().to_string(),
            author_id: author_id.into(),
            title: title.into(),
            prompt: None,
            status: TopicStatus::Pending,
            score: 50,
        }
    }

    pub fn approved(mut self) -> Self {
        self.status = TopicStatus::Approved;
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }
}
