//! ABOUTME: Template repository for the reusable generation recipes
//! ABOUTME: Maps rows to context records and serves the factory's template lookups

use super::{parse_column, to_u32};
use crate::to_db_time;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_context::{Template, TemplateStore};
use ql_core::{Error, Result};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: String,
    name: String,
    prompt_template: String,
    title_prompt: Option<String>,
    voice_id: Option<String>,
    post_quantity: i64,
    image_prompt: Option<String>,
    generate_featured_image: bool,
    featured_image_source: Option<String>,
    unsplash_keywords: Option<String>,
    media_ids: Option<String>,
    post_status: String,
    post_category: Option<String>,
    post_tags: Option<String>,
    post_author: Option<String>,
    article_structure_id: Option<String>,
    is_active: bool,
}

impl TryFrom<TemplateRow> for Template {
    type Error = Error;

    fn try_from(row: TemplateRow) -> Result<Self> {
        let featured_image_source = row
            .featured_image_source
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_column("featured_image_source", s))
            .transpose()?;

        Ok(Template {
            id: row.id,
            name: row.name,
            prompt_template: row.prompt_template,
            title_prompt: row.title_prompt,
            voice_id: row.voice_id,
            post_quantity: to_u32("post_quantity", row.post_quantity)?,
            image_prompt: row.image_prompt,
            generate_featured_image: row.generate_featured_image,
            featured_image_source,
            unsplash_keywords: row.unsplash_keywords,
            media_ids: row.media_ids,
            post_status: parse_column("post_status", &row.post_status)?,
            post_category: row.post_category,
            post_tags: row.post_tags,
            post_author: row.post_author,
            article_structure_id: row.article_structure_id,
            is_active: row.is_active,
        })
    }
}

const SELECT_TEMPLATE: &str = r#"
    SELECT id, name, prompt_template, title_prompt, voice_id, post_quantity, image_prompt,
           generate_featured_image, featured_image_source, unsplash_keywords, media_ids,
           post_status, post_category, post_tags, post_author, article_structure_id, is_active
    FROM templates
"#;

/// Template repository
#[derive(Debug, Clone)]
pub struct TemplateRepository {
    pool: SqlitePool,
}

impl TemplateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a template
    pub async fn create(&self, template: &Template, created_at: NaiveDateTime) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO templates (
                id, name, prompt_template, title_prompt, voice_id, post_quantity, image_prompt,
                generate_featured_image, featured_image_source, unsplash_keywords, media_ids,
                post_status, post_category, post_tags, post_author, article_structure_id,
                is_active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
        )
        .bind(&template.id)
        .bind(&template.name)
        .bind(&template.prompt_template)
        .bind(&template.title_prompt)
        .bind(&template.voice_id)
        .bind(i64::from(template.post_quantity))
        .bind(&template.image_prompt)
        .bind(template.generate_featured_image)
        .bind(template.featured_image_source.map(|s| s.as_str()))
        .bind(&template.unsplash_keywords)
        .bind(&template.media_ids)
        .bind(template.post_status.as_str())
        .bind(&template.post_category)
        .bind(&template.post_tags)
        .bind(&template.post_author)
        .bind(&template.article_structure_id)
        .bind(template.is_active)
        .bind(to_db_time(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create template: {}", e)))?;

        Ok(())
    }

    /// Find template by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Template>> {
        let query = format!("{} WHERE id = ?1", SELECT_TEMPLATE);
        let row = sqlx::query_as::<_, TemplateRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find template: {}", e)))?;

        row.map(Template::try_from).transpose()
    }

    /// All templates ordered by name
    pub async fn list(&self, active_only: bool) -> Result<Vec<Template>> {
        let query = if active_only {
            format!("{} WHERE is_active = 1 ORDER BY name", SELECT_TEMPLATE)
        } else {
            format!("{} ORDER BY name", SELECT_TEMPLATE)
        };
        let rows = sqlx::query_as::<_, TemplateRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to list templates: {}", e)))?;

        rows.into_iter().map(Template::try_from).collect()
    }

    /// Delete template
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM templates WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete template: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TemplateStore for TemplateRepository {
    async fn get_template(&self, id: &str) -> Result<Option<Template>> {
        self.find_by_id(id).await
    }
}
