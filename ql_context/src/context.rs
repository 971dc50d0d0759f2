//! ABOUTME: The uniform read contract every generation context satisfies
//! ABOUTME: Generators consume only this trait, never the concrete variants

use crate::{FeaturedImageSource, PostStatus, TemplateContext, TopicContext, Voice};
use serde::{Deserialize, Serialize};

/// Which source a context was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Template,
    Topic,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Template => "template",
            ContextKind::Topic => "topic",
        }
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to generate and how.
///
/// Every accessor returns a sensible default instead of failing, including
/// the image fields when no featured image is wanted.
pub trait GenerationContext: Send + Sync {
    fn kind(&self) -> ContextKind;
    fn id(&self) -> &str;
    fn name(&self) -> String;

    fn content_prompt(&self) -> String;
    fn title_prompt(&self) -> String;
    fn image_prompt(&self) -> Option<String>;

    fn should_generate_featured_image(&self) -> bool;
    fn featured_image_source(&self) -> FeaturedImageSource;
    fn unsplash_keywords(&self) -> String;
    fn media_library_ids(&self) -> Vec<String>;

    fn post_status(&self) -> PostStatus;
    fn post_category(&self) -> Option<String>;
    fn post_tags(&self) -> Vec<String>;
    fn post_author(&self) -> String;

    fn article_structure_id(&self) -> Option<String>;
    fn voice_id(&self) -> Option<String>;
    fn voice(&self) -> Option<&Voice>;

    /// The topic text actually used for content, which may differ from the title prompt
    fn topic(&self) -> Option<String>;

    /// Canonical serialisable projection for audit and storage
    fn to_record(&self) -> ContextRecord;
}

/// Variant specific part of a [`ContextRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextDetails {
    Topic {
        topic: String,
        author_id: String,
        author_name: String,
        field_niche: String,
        article_structure_id: Option<String>,
    },
    Template {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voice_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        article_structure_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    #[serde(rename = "type")]
    pub kind: ContextKind,
    pub id: String,
    pub name: String,
    pub content_prompt: String,
    pub title_prompt: String,
    pub post_status: PostStatus,
    pub post_category: Option<String>,
    pub post_tags: Vec<String>,
    pub post_author: String,
    #[serde(flatten)]
    pub details: ContextDetails,
}

/// Closed set of known variants, dispatching to the shared trait
#[derive(Debug, Clone)]
pub enum Context {
    Template(TemplateContext),
    Topic(TopicContext),
}

impl Context {
    fn inner(&self) -> &dyn GenerationContext {
        match self {
            Context::Template(ctx) => ctx,
            Context::Topic(ctx) => ctx,
        }
    }
}

impl From<TemplateContext> for Context {
    fn from(value: TemplateContext) -> Self {
        Context::Template(value)
    }
}

impl From<TopicContext> for Context {
    fn from(value: TopicContext) -> Self {
        Context::Topic(value)
    }
}

impl GenerationContext for Context {
    fn kind(&self) -> ContextKind {
        self.inner().kind()
    }

    fn id(&self) -> &str {
        self.inner().id()
    }

    fn name(&self) -> String {
        self.inner().name()
    }

    fn content_prompt(&self) -> String {
        self.inner().content_prompt()
    }

    fn title_prompt(&self) -> String {
        self.inner().title_prompt()
    }

    fn image_prompt(&self) -> Option<String> {
        self.inner().image_prompt()
    }

    fn should_generate_featured_image(&self) -> bool {
        self.inner().should_generate_featured_image()
    }

    fn featured_image_source(&self) -> FeaturedImageSource {
        self.inner().featured_image_source()
    }

    fn unsplash_keywords(&self) -> String {
        self.inner().unsplash_keywords()
    }

    fn media_library_ids(&self) -> Vec<String> {
        self.inner().media_library_ids()
    }

    fn post_status(&self) -> PostStatus {
        self.inner().post_status()
    }

    fn post_category(&self) -> Option<String> {
        self.inner().post_category()
    }

    fn post_tags(&self) -> Vec<String> {
        self.inner().post_tags()
    }

    fn post_author(&self) -> String {
        self.inner().post_author()
    }

    fn article_structure_id(&self) -> Option<String> {
        self.inner().article_structure_id()
    }

    fn voice_id(&self) -> Option<String> {
        self.inner().voice_id()
    }

    fn voice(&self) -> Option<&Voice> {
        self.inner().voice()
    }

    fn topic(&self) -> Option<String> {
        self.inner().topic()
    }

    fn to_record(&self) -> ContextRecord {
        self.inner().to_record()
    }
}
