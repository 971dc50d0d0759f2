//! ABOUTME: Author topic repository with review status and sampling score
//! ABOUTME: Approved topics come back highest score first

use super::parse_column;
use crate::to_db_time;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_context::{Topic, TopicStatus, TopicStore};
use ql_core::{Error, Result};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, FromRow)]
struct TopicRow {
    id: String,
    author_id: String,
    topic_title: String,
    topic_prompt: Option<String>,
    status: String,
    score: i64,
}

impl TryFrom<TopicRow> for Topic {
    type Error = Error;

    fn try_from(row: TopicRow) -> Result<Self> {
        Ok(Topic {
            id: row.id,
            author_id: row.author_id,
            title: row.topic_title,
            prompt: row.topic_prompt,
            status: parse_column("status", &row.status)?,
            score: row.score,
        })
    }
}

const SELECT_TOPIC: &str = r#"
    SELECT id, author_id, topic_title, topic_prompt, status, score
    FROM author_topics
"#;

/// Author topic repository
#[derive(Debug, Clone)]
pub struct TopicRepository {
    pool: SqlitePool,
}

impl TopicRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, topic: &Topic, created_at: NaiveDateTime) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO author_topics (id, author_id, topic_title, topic_prompt, status, score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&topic.id)
        .bind(&topic.author_id)
        .bind(&topic.title)
        .bind(&topic.prompt)
        .bind(topic.status.as_str())
        .bind(topic.score)
        .bind(to_db_time(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create topic: {}", e)))?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Topic>> {
        let query = format!("{} WHERE id = ?1", SELECT_TOPIC);
        let row = sqlx::query_as::<_, TopicRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find topic: {}", e)))?;

        row.map(Topic::try_from).transpose()
    }

    /// Topics of an author in a given review state
    pub async fn list_for_author(&self, author_id: &str, status: TopicStatus) -> Result<Vec<Topic>> {
        let query = format!(
            "{} WHERE author_id = ?1 AND status = ?2 ORDER BY score DESC, created_at",
            SELECT_TOPIC
        );
        let rows = sqlx::query_as::<_, TopicRow>(&query)
            .bind(author_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to list topics: {}", e)))?;

        rows.into_iter().map(Topic::try_from).collect()
    }

    pub async fn set_status(&self, topic_id: &str, status: TopicStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE author_topics SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update topic status: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TopicStore for TopicRepository {
    async fn get_topic(&self, id: &str) -> Result<Option<Topic>> {
        self.find_by_id(id).await
    }

    async fn approved_for_author(&self, author_id: &str) -> Result<Vec<Topic>> {
        self.list_for_author(author_id, TopicStatus::Approved).await
    }

    async fn mark_used(&self, topic_id: &str) -> Result<()> {
        self.set_status(topic_id, TopicStatus::Used).await.map(|_| ())
    }
}
