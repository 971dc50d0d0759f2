//! ABOUTME: Author repository: personas and their post generation clock
//! ABOUTME: Serves the factory's author lookups and the author executor's due query

use super::parse_column;
use crate::{from_db_time, to_db_time};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_context::{Author, AuthorStore};
use ql_core::{Error, Result};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, FromRow)]
struct AuthorRow {
    id: String,
    name: String,
    field_niche: String,
    description: Option<String>,
    keywords: Option<String>,
    article_structure_id: Option<String>,
    post_generation_frequency: String,
    post_generation_next_run: Option<String>,
    post_generation_last_run: Option<String>,
    post_status: String,
    post_category: Option<String>,
    post_tags: Option<String>,
    post_author: Option<String>,
    generate_featured_image: bool,
    featured_image_source: Option<String>,
    is_active: bool,
}

impl TryFrom<AuthorRow> for Author {
    type Error = Error;

    fn try_from(row: AuthorRow) -> Result<Self> {
        let featured_image_source = row
            .featured_image_source
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_column("featured_image_source", s))
            .transpose()?;

        Ok(Author {
            id: row.id,
            name: row.name,
            field_niche: row.field_niche,
            description: row.description,
            keywords: row.keywords,
            article_structure_id: row.article_structure_id,
            post_generation_frequency: row.post_generation_frequency,
            post_generation_next_run: from_db_time(row.post_generation_next_run)?,
            post_generation_last_run: from_db_time(row.post_generation_last_run)?,
            post_status: parse_column("post_status", &row.post_status)?,
            post_category: row.post_category,
            post_tags: row.post_tags,
            post_author: row.post_author,
            generate_featured_image: row.generate_featured_image,
            featured_image_source,
            is_active: row.is_active,
        })
    }
}

const SELECT_AUTHOR: &str = r#"
    SELECT id, name, field_niche, description, keywords, article_structure_id,
           post_generation_frequency, post_generation_next_run, post_generation_last_run,
           post_status, post_category, post_tags, post_author, generate_featured_image,
           featured_image_source, is_active
    FROM authors
"#;

/// Author repository
#[derive(Debug, Clone)]
pub struct AuthorRepository {
    pool: SqlitePool,
}

impl AuthorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, author: &Author, created_at: NaiveDateTime) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authors (
                id, name, field_niche, description, keywords, article_structure_id,
                post_generation_frequency, post_generation_next_run, post_generation_last_run,
                post_status, post_category, post_tags, post_author, generate_featured_image,
                featured_image_source, is_active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&author.id)
        .bind(&author.name)
        .bind(&author.field_niche)
        .bind(&author.description)
        .bind(&author.keywords)
        .bind(&author.article_structure_id)
        .bind(&author.post_generation_frequency)
        .bind(author.post_generation_next_run.map(to_db_time))
        .bind(author.post_generation_last_run.map(to_db_time))
        .bind(author.post_status.as_str())
        .bind(&author.post_category)
        .bind(&author.post_tags)
        .bind(&author.post_author)
        .bind(author.generate_featured_image)
        .bind(author.featured_image_source.map(|s| s.as_str()))
        .bind(author.is_active)
        .bind(to_db_time(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create author: {}", e)))?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Author>> {
        let query = format!("{} WHERE id = ?1", SELECT_AUTHOR);
        let row = sqlx::query_as::<_, AuthorRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find author: {}", e)))?;

        row.map(Author::try_from).transpose()
    }
}

#[async_trait]
impl AuthorStore for AuthorRepository {
    async fn get_author(&self, id: &str) -> Result<Option<Author>> {
        self.find_by_id(id).await
    }

    async fn due_for_post_generation(&self, now: NaiveDateTime) -> Result<Vec<Author>> {
        let query = format!(
            "{} WHERE is_active = 1 AND post_generation_next_run IS NOT NULL AND post_generation_next_run <= ?1 ORDER BY post_generation_next_run",
            SELECT_AUTHOR
        );
        let rows = sqlx::query_as::<_, AuthorRow>(&query)
            .bind(to_db_time(now))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to fetch due authors: {}", e)))?;

        rows.into_iter().map(Author::try_from).collect()
    }

    async fn update_post_generation_schedule(
        &self,
        author_id: &str,
        next_run: NaiveDateTime,
        last_run: Option<NaiveDateTime>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE authors
            SET post_generation_next_run = ?1,
                post_generation_last_run = COALESCE(?2, post_generation_last_run)
            WHERE id = ?3
            "#,
        )
        .bind(to_db_time(next_run))
        .bind(last_run.map(to_db_time))
        .bind(author_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to update author schedule: {}", e)))?;

        Ok(())
    }
}
