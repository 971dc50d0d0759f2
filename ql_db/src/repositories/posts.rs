//! ABOUTME: Post repository storing generated posts with their context snapshot
//! ABOUTME: Featured image and context are kept as JSON columns

use super::parse_column;
use crate::{from_db_time, to_db_time};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_ai::{FeaturedImage, GeneratedPost};
use ql_context::{split_list, ContextRecord, PostStatus};
use ql_core::{Error, Id, Result};
use ql_scheduler::PostStore;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A generated post as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub article_structure_id: Option<String>,
    pub featured_image: Option<FeaturedImage>,
    pub context: ContextRecord,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, FromRow)]
struct PostRow {
    id: String,
    title: String,
    content: String,
    status: String,
    category: Option<String>,
    tags: String,
    author: String,
    article_structure_id: Option<String>,
    featured_image: Option<String>,
    context: String,
    created_at: Option<String>,
}

impl TryFrom<PostRow> for StoredPost {
    type Error = Error;

    fn try_from(row: PostRow) -> Result<Self> {
        let featured_image = row
            .featured_image
            .as_deref()
            .map(serde_json::from_str::<FeaturedImage>)
            .transpose()?;

        Ok(StoredPost {
            id: row.id,
            title: row.title,
            content: row.content,
            status: parse_column("status", &row.status)?,
            category: row.category,
            tags: split_list(Some(&row.tags)),
            author: row.author,
            article_structure_id: row.article_structure_id,
            featured_image,
            context: serde_json::from_str(&row.context)?,
            created_at: from_db_time(row.created_at)?,
        })
    }
}

const SELECT_POST: &str = r#"
    SELECT id, title, content, status, category, tags, author, article_structure_id,
           featured_image, context, created_at
    FROM posts
"#;

/// Post repository
#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<StoredPost>> {
        let query = format!("{} WHERE id = ?1", SELECT_POST);
        let row = sqlx::query_as::<_, PostRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find post: {}", e)))?;

        row.map(StoredPost::try_from).transpose()
    }

    /// Most recent posts first
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<StoredPost>> {
        let query = format!("{} ORDER BY created_at DESC, id DESC LIMIT ?1", SELECT_POST);
        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to list posts: {}", e)))?;

        rows.into_iter().map(StoredPost::try_from).collect()
    }
}

#[async_trait]
impl PostStore for PostRepository {
    async fn save_post(&self, post: &GeneratedPost, created_at: NaiveDateTime) -> Result<String> {
        let id = Id::new().to_string();
        let featured_image = post
            .featured_image
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let context = serde_json::to_string(&post.context)?;

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, title, content, status, category, tags, author, article_structure_id,
                featured_image, context_type, context_id, context, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.status.as_str())
        .bind(&post.category)
        .bind(post.tags.join(", "))
        .bind(&post.author)
        .bind(&post.article_structure_id)
        .bind(featured_image)
        .bind(post.context.kind.as_str())
        .bind(&post.context.id)
        .bind(context)
        .bind(to_db_time(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to save post: {}", e)))?;

        Ok(id)
    }
}
