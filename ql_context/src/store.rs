//! ABOUTME: Narrow lookup interfaces for the records a context is built from
//! ABOUTME: Implemented by the SQLite repositories and by in-memory fakes in tests

use crate::{Author, Template, Topic, Voice};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_core::Result;

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template(&self, id: &str) -> Result<Option<Template>>;
}

#[async_trait]
pub trait VoiceStore: Send + Sync {
    async fn get_voice(&self, id: &str) -> Result<Option<Voice>>;
}

#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn get_author(&self, id: &str) -> Result<Option<Author>>;

    /// Active authors whose post generation is due at `now`
    async fn due_for_post_generation(&self, now: NaiveDateTime) -> Result<Vec<Author>>;

    /// Record a post generation run and the next one
    async fn update_post_generation_schedule(
        &self,
        author_id: &str,
        next_run: NaiveDateTime,
        last_run: Option<NaiveDateTime>,
    ) -> Result<()>;
}

#[async_trait]
pub trait TopicStore: Send + Sync {
    async fn get_topic(&self, id: &str) -> Result<Option<Topic>>;

    /// Approved topics for an author, highest score first
    async fn approved_for_author(&self, author_id: &str) -> Result<Vec<Topic>>;

    async fn mark_used(&self, topic_id: &str) -> Result<()>;
}
