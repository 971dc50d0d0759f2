//! ABOUTME: Generation context backed by an author and one of their approved topics
//! ABOUTME: Prompts are synthesised from the topic title, the author's niche and related topics

use crate::{
    split_list, Author, ContextDetails, ContextKind, ContextRecord, FeaturedImageSource,
    GenerationContext, PostStatus, Topic, Voice,
};

#[derive(Debug, Clone)]
pub struct TopicContext {
    author: Author,
    topic: Topic,
    expanded_context: String,
    default_author: String,
}

impl TopicContext {
    pub fn new(author: Author, topic: Topic, default_author: impl Into<String>) -> Self {
        Self {
            author,
            topic,
            expanded_context: String::new(),
            default_author: default_author.into(),
        }
    }

    /// Extra prompt text assembled from related approved topics
    pub fn with_expanded_context(mut self, expanded_context: impl Into<String>) -> Self {
        self.expanded_context = expanded_context.into();
        self
    }

    pub fn author(&self) -> &Author {
        &self.author
    }
}

impl GenerationContext for TopicContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Topic
    }

    fn id(&self) -> &str {
        &self.topic.id
    }

    fn name(&self) -> String {
        format!("{}: {}", self.author.name, self.topic.title)
    }

    fn content_prompt(&self) -> String {
        let mut prompt = format!(
            "Write a comprehensive blog post about: {}\n\nField/Niche: {}",
            self.topic.title, self.author.field_niche
        );
        if !self.expanded_context.trim().is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.expanded_context);
        }
        prompt
    }

    fn title_prompt(&self) -> String {
        self.topic.title.clone()
    }

    fn image_prompt(&self) -> Option<String> {
        Some(self.topic.title.clone())
    }

    fn should_generate_featured_image(&self) -> bool {
        self.author.generate_featured_image
    }

    fn featured_image_source(&self) -> FeaturedImageSource {
        self.author.featured_image_source.unwrap_or_default()
    }

    fn unsplash_keywords(&self) -> String {
        String::new()
    }

    fn media_library_ids(&self) -> Vec<String> {
        Vec::new()
    }

    fn post_status(&self) -> PostStatus {
        self.author.post_status
    }

    fn post_category(&self) -> Option<String> {
        self.author.post_category.clone()
    }

    fn post_tags(&self) -> Vec<String> {
        split_list(self.author.post_tags.as_deref())
    }

    fn post_author(&self) -> String {
        self.author
            .post_author
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.default_author.clone())
    }

    fn article_structure_id(&self) -> Option<String> {
        self.author.article_structure_id.clone()
    }

    fn voice_id(&self) -> Option<String> {
        None
    }

    fn voice(&self) -> Option<&Voice> {
        None
    }

    fn topic(&self) -> Option<String> {
        Some(self.topic.title.clone())
    }

    fn to_record(&self) -> ContextRecord {
        ContextRecord {
            kind: self.kind(),
            id: self.id().to_string(),
            name: self.name(),
            content_prompt: self.content_prompt(),
            title_prompt: self.title_prompt(),
            post_status: self.post_status(),
            post_category: self.post_category(),
            post_tags: self.post_tags(),
            post_author: self.post_author(),
            details: ContextDetails::Topic {
                topic: self.topic.title.clone(),
                author_id: self.author.id.clone(),
                author_name: self.author.name.clone(),
                field_niche: self.author.field_niche.clone(),
                article_structure_id: self.article_structure_id(),
            },
        }
    }
}
