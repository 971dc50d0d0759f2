//! ABOUTME: Generation context backed by a reusable template
//! ABOUTME: Optional voice overrides the title prompt; optional topic text overrides nothing but the topic

use crate::{
    split_list, ContextDetails, ContextKind, ContextRecord, FeaturedImageSource,
    GenerationContext, PostStatus, Template, Voice,
};

#[derive(Debug, Clone)]
pub struct TemplateContext {
    template: Template,
    voice: Option<Voice>,
    topic: Option<String>,
    article_structure_override: Option<String>,
    default_author: String,
}

impl TemplateContext {
    /// `default_author` stands in when the template names no post author
    pub fn new(template: Template, default_author: impl Into<String>) -> Self {
        Self {
            template,
            voice: None,
            topic: None,
            article_structure_override: None,
            default_author: default_author.into(),
        }
    }

    pub fn with_voice(mut self, voice: Option<Voice>) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.topic = topic.filter(|t| !t.trim().is_empty());
        self
    }

    /// Article structure chosen on the schedule, taking precedence over the template's
    pub fn with_article_structure(mut self, structure_id: Option<String>) -> Self {
        self.article_structure_override = structure_id;
        self
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

impl GenerationContext for TemplateContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Template
    }

    fn id(&self) -> &str {
        &self.template.id
    }

    fn name(&self) -> String {
        self.template.name.clone()
    }

    fn content_prompt(&self) -> String {
        self.template.prompt_template.clone()
    }

    fn title_prompt(&self) -> String {
        if let Some(voice) = self.voice.as_ref().filter(|v| !v.title_prompt.is_empty()) {
            return voice.title_prompt.clone();
        }
        self.template.title_prompt.clone().unwrap_or_default()
    }

    fn image_prompt(&self) -> Option<String> {
        self.template.image_prompt.clone().filter(|p| !p.is_empty())
    }

    fn should_generate_featured_image(&self) -> bool {
        self.template.generate_featured_image
    }

    fn featured_image_source(&self) -> FeaturedImageSource {
        self.template.featured_image_source.unwrap_or_default()
    }

    fn unsplash_keywords(&self) -> String {
        self.template.unsplash_keywords.clone().unwrap_or_default()
    }

    fn media_library_ids(&self) -> Vec<String> {
        split_list(self.template.media_ids.as_deref())
    }

    fn post_status(&self) -> PostStatus {
        self.template.post_status
    }

    fn post_category(&self) -> Option<String> {
        self.template.post_category.clone()
    }

    fn post_tags(&self) -> Vec<String> {
        split_list(self.template.post_tags.as_deref())
    }

    fn post_author(&self) -> String {
        self.template
            .post_author
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.default_author.clone())
    }

    fn article_structure_id(&self) -> Option<String> {
        self.article_structure_override
            .clone()
            .or_else(|| self.template.article_structure_id.clone())
    }

    fn voice_id(&self) -> Option<String> {
        self.voice.as_ref().map(|v| v.id.clone())
    }

    fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    fn topic(&self) -> Option<String> {
        self.topic.clone()
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
            details: ContextDetails::Template {
                topic: self.topic(),
                voice_id: self.voice_id(),
                article_structure_id: self.article_structure_id(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        let mut template = Template::new("Weekly Rust", "Write about {{topic}}");
        template.title_prompt = Some("A title about {{topic}}".to_string());
        template.post_tags = Some("rust, weekly".to_string());
        template
    }

    #[test]
    fn test_voice_title_prompt_wins() {
        let voice = Voice::new("Playful", "Give a playful title for {{topic}}", "Be playful.");
        let ctx = TemplateContext::new(template(), "admin").with_voice(Some(voice.clone()));
        assert_eq!(ctx.title_prompt(), "Give a playful title for {{topic}}");
        assert_eq!(ctx.voice_id(), Some(voice.id));

        let plain = TemplateContext::new(template(), "admin");
        assert_eq!(plain.title_prompt(), "A title about {{topic}}");
        assert!(plain.voice().is_none());
    }

    #[test]
    fn test_empty_voice_title_falls_back() {
        let voice = Voice::new("Quiet", "", "Be terse.");
        let ctx = TemplateContext::new(template(), "admin").with_voice(Some(voice));
        assert_eq!(ctx.title_prompt(), "A title about {{topic}}");
    }

    #[test]
    fn test_author_defaults() {
        let ctx = TemplateContext::new(template(), "editor");
        assert_eq!(ctx.post_author(), "editor");

        let mut owned = template();
        owned.post_author = Some("ada".to_string());
        assert_eq!(TemplateContext::new(owned, "editor").post_author(), "ada");
    }

    #[test]
    fn test_blank_topic_is_dropped() {
        let ctx = TemplateContext::new(template(), "admin").with_topic(Some("   ".to_string()));
        assert_eq!(ctx.topic(), None);
    }

    #[test]
    fn test_record_omits_absent_optionals() {
        let ctx = TemplateContext::new(template(), "admin");
        let json = serde_json::to_value(ctx.to_record()).unwrap();
        assert_eq!(json["type"], "template");
        assert_eq!(json["post_tags"], serde_json::json!(["rust", "weekly"]));
        assert!(json.get("topic").is_none());
        assert!(json.get("voice_id").is_none());

        let with_topic = TemplateContext::new(template(), "admin")
            .with_topic(Some("lifetimes".to_string()))
            .with_article_structure(Some("listicle".to_string()));
        let json = serde_json::to_value(with_topic.to_record()).unwrap();
        assert_eq!(json["topic"], "lifetimes");
        assert_eq!(json["article_structure_id"], "listicle");
    }
}
