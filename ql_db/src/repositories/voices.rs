//! ABOUTME: Voice repository for tone and style overrides
//! ABOUTME: Serves the factory's voice lookups

use crate::to_db_time;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_context::{Voice, VoiceStore};
use ql_core::{Error, Result};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, FromRow)]
struct VoiceRow {
    id: String,
    name: String,
    title_prompt: String,
    content_instructions: String,
    excerpt_instructions: Option<String>,
    is_active: bool,
}

impl From<VoiceRow> for Voice {
    fn from(row: VoiceRow) -> Self {
        Voice {
            id: row.id,
            name: row.name,
            title_prompt: row.title_prompt,
            content_instructions: row.content_instructions,
            excerpt_instructions: row.excerpt_instructions,
            is_active: row.is_active,
        }
    }
}

/// Voice repository
#[derive(Debug, Clone)]
pub struct VoiceRepository {
    pool: SqlitePool,
}

impl VoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, voice: &Voice, created_at: NaiveDateTime) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO voices (id, name, title_prompt, content_instructions, excerpt_instructions, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&voice.id)
        .bind(&voice.name)
        .bind(&voice.title_prompt)
        .bind(&voice.content_instructions)
        .bind(&voice.excerpt_instructions)
        .bind(voice.is_active)
        .bind(to_db_time(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create voice: {}", e)))?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Voice>> {
        let row = sqlx::query_as::<_, VoiceRow>(
            r#"
            SELECT id, name, title_prompt, content_instructions, excerpt_instructions, is_active
            FROM voices WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to find voice: {}", e)))?;

        Ok(row.map(Voice::from))
    }
}

#[async_trait]
impl VoiceStore for VoiceRepository {
    async fn get_voice(&self, id: &str) -> Result<Option<Voice>> {
        self.find_by_id(id).await
    }
}
