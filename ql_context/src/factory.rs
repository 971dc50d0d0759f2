//! ABOUTME: Resolves backing records and builds generation contexts
//! ABOUTME: Fails with MissingBackingRecord before any context is constructed

use crate::{
    expanded_context, Author, AuthorStore, TemplateContext, TemplateStore, Topic,
    TopicContext, TopicStore, VoiceStore,
};
use ql_core::{Error, Result};
use ql_sched::Schedule;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds contexts from stored records
#[derive(Clone)]
pub struct ContextFactory {
    templates: Arc<dyn TemplateStore>,
    voices: Arc<dyn VoiceStore>,
    authors: Arc<dyn AuthorStore>,
    topics: Arc<dyn TopicStore>,
    default_author: String,
    expanded_context_limit: usize,
}

impl ContextFactory {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        voices: Arc<dyn VoiceStore>,
        authors: Arc<dyn AuthorStore>,
        topics: Arc<dyn TopicStore>,
    ) -> Self {
        Self {
            templates,
            voices,
            authors,
            topics,
            default_author: "admin".to_string(),
            expanded_context_limit: 5,
        }
    }

    /// Post author used when neither template nor author names one
    pub fn with_default_author(mut self, default_author: impl Into<String>) -> Self {
        self.default_author = default_author.into();
        self
    }

    pub fn with_expanded_context_limit(mut self, limit: usize) -> Self {
        self.expanded_context_limit = limit;
        self
    }

    /// Template context for a due schedule, with its topic and structure overrides
    pub async fn for_schedule(&self, schedule: &Schedule) -> Result<TemplateContext> {
        let template_id = schedule
            .template_id
            .as_deref()
            .ok_or_else(|| Error::missing("template", format!("none on schedule {}", schedule.id)))?;

        let template = self
            .templates
            .get_template(template_id)
            .await?
            .ok_or_else(|| Error::missing("template", template_id))?;

        // A dangling voice only loses its overrides
        let voice = match template.voice_id.as_deref() {
            Some(voice_id) => {
                let voice = self.voices.get_voice(voice_id).await?;
                if voice.is_none() {
                    warn!(template_id = %template.id, voice_id = %voice_id, "Template voice not found, generating without it");
                }
                voice
            }
            None => None,
        };

        debug!(schedule_id = %schedule.id, template_id = %template.id, "Built template context");

        Ok(TemplateContext::new(template, self.default_author.clone())
            .with_voice(voice)
            .with_topic(schedule.topic.clone())
            .with_article_structure(schedule.article_structure_id.clone()))
    }

    /// Topic context for an author's topic, both looked up by id
    pub async fn for_topic(&self, author_id: &str, topic_id: &str) -> Result<TopicContext> {
        let author = self
            .authors
            .get_author(author_id)
            .await?
            .ok_or_else(|| Error::missing("author", author_id))?;
        let topic = self
            .topics
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| Error::missing("topic", topic_id))?;

        if topic.author_id != author.id {
            return Err(Error::Validation(format!(
                "Topic {} does not belong to author {}",
                topic.id, author.id
            )));
        }

        self.from_records(author, topic).await
    }

    /// Topic context for a topic id, resolving its owning author
    pub async fn for_topic_id(&self, topic_id: &str) -> Result<TopicContext> {
        let topic = self
            .topics
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| Error::missing("topic", topic_id))?;
        let author = self
            .authors
            .get_author(&topic.author_id)
            .await?
            .ok_or_else(|| Error::missing("author", topic.author_id.clone()))?;

        self.from_records(author, topic).await
    }

    /// Topic context from already resolved records, adding the expanded context
    pub async fn from_records(&self, author: Author, topic: Topic) -> Result<TopicContext> {
        let related = self.topics.approved_for_author(&author.id).await?;
        let expansion = expanded_context(&related, &topic.id, self.expanded_context_limit);

        debug!(
            author_id = %author.id,
            topic_id = %topic.id,
            expanded = !expansion.is_empty(),
            "Built topic context"
        );

        Ok(TopicContext::new(author, topic, self.default_author.clone())
            .with_expanded_context(expansion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenerationContext, Template, Voice};
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        templates: HashMap<String, Template>,
        voices: HashMap<String, Voice>,
        authors: HashMap<String, Author>,
        topics: Mutex<Vec<Topic>>,
    }

    #[async_trait]
    impl TemplateStore for MemoryStore {
        async fn get_template(&self, id: &str) -> Result<Option<Template>> {
            Ok(self.templates.get(id).cloned())
        }
    }

    #[async_trait]
    impl VoiceStore for MemoryStore {
        async fn get_voice(&self, id: &str) -> Result<Option<Voice>> {
            Ok(self.voices.get(id).cloned())
        }
    }

    #[async_trait]
    impl AuthorStore for MemoryStore {
        async fn get_author(&self, id: &str) -> Result<Option<Author>> {
            Ok(self.authors.get(id).cloned())
        }

        async fn due_for_post_generation(&self, _now: NaiveDateTime) -> Result<Vec<Author>> {
            Ok(Vec::new())
        }

        async fn update_post_generation_schedule(
            &self,
            _author_id: &str,
            _next_run: NaiveDateTime,
            _last_run: Option<NaiveDateTime>,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl TopicStore for MemoryStore {
        async fn get_topic(&self, id: &str) -> Result<Option<Topic>> {
            Ok(self.topics.lock().unwrap().iter().find(|t| t.id == id).cloned())
        }

        async fn approved_for_author(&self, author_id: &str) -> Result<Vec<Topic>> {
            Ok(self
                .topics
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.author_id == author_id)
                .cloned()
                .collect())
        }

        async fn mark_used(&self, _topic_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn factory(store: MemoryStore) -> ContextFactory {
        let store = Arc::new(store);
        ContextFactory::new(store.clone(), store.clone(), store.clone(), store).with_default_author("editor")
    }

    #[tokio::test]
    async fn test_schedule_with_missing_template() {
        let factory = factory(MemoryStore::default());
        let schedule = Schedule::new("gone", "daily");
        let err = factory.for_schedule(&schedule).await.unwrap_err();
        assert!(matches!(err, Error::MissingBackingRecord { kind: "template", .. }));
    }

    #[tokio::test]
    async fn test_schedule_overrides_and_voice() {
        let voice = Voice::new("Crisp", "Crisp title for {{topic}}", "Short sentences.");
        let mut template = Template::new("Digest", "Digest of {{topic}}");
        template.voice_id = Some(voice.id.clone());
        template.article_structure_id = Some("template-structure".to_string());

        let mut store = MemoryStore::default();
        store.voices.insert(voice.id.clone(), voice.clone());
        store.templates.insert(template.id.clone(), template.clone());
        let factory = factory(store);

        let schedule = Schedule::new(template.id.clone(), "weekly")
            .with_topic("Rust 2024 edition")
            .with_article_structure("schedule-structure");
        let ctx = factory.for_schedule(&schedule).await.unwrap();

        assert_eq!(ctx.topic().as_deref(), Some("Rust 2024 edition"));
        assert_eq!(ctx.article_structure_id().as_deref(), Some("schedule-structure"));
        assert_eq!(ctx.voice_id(), Some(voice.id));
        assert_eq!(ctx.post_author(), "editor");
    }

    #[tokio::test]
    async fn test_dangling_voice_is_tolerated() {
        let mut template = Template::new("Digest", "Digest");
        template.voice_id = Some("deleted-voice".to_string());
        let mut store = MemoryStore::default();
        store.templates.insert(template.id.clone(), template.clone());

        let ctx = factory(store)
            .for_schedule(&Schedule::new(template.id.clone(), "daily"))
            .await
            .unwrap();
        assert!(ctx.voice().is_none());
    }

    #[tokio::test]
    async fn test_topic_resolution_errors() {
        let author = Author::new("Ferris", "Rust");
        let topic = Topic::new(author.id.clone(), "Generics").approved();
        let mut store = MemoryStore::default();
        store.topics.lock().unwrap().push(topic.clone());
        let factory = factory(store);

        let err = factory.for_topic(&author.id, &topic.id).await.unwrap_err();
        assert!(matches!(err, Error::MissingBackingRecord { kind: "author", .. }));

        let err = factory.for_topic_id("nope").await.unwrap_err();
        assert!(matches!(err, Error::MissingBackingRecord { kind: "topic", .. }));
    }

    #[tokio::test]
    async fn test_topic_context_gets_expansion() {
        let author = Author::new("Ferris", "Rust");
        let topic = Topic::new(author.id.clone(), "Generics").approved();
        let sibling = Topic::new(author.id.clone(), "Trait objects").approved();
        let mut store = MemoryStore::default();
        store.authors.insert(author.id.clone(), author.clone());
        store.topics.lock().unwrap().extend([topic.clone(), sibling]);

        let ctx = factory(store).for_topic_id(&topic.id).await.unwrap();
        assert!(ctx
            .content_prompt()
            .ends_with("Related approved topics:\n- Trait objects"));
    }
}
