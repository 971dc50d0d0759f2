//! ABOUTME: Activity repository recording executor events
//! ABOUTME: Each event is stored with its message and the full event as JSON details

use crate::{from_db_time, to_db_time};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_core::{Error, Id, Result};
use ql_scheduler::{ActivityLog, ExecutionEvent};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A recorded activity line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub event_status: String,
    pub source: String,
    pub subject_id: String,
    pub message: String,
    pub event: ExecutionEvent,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: String,
    event_status: String,
    source: String,
    subject_id: String,
    message: String,
    details: String,
    created_at: Option<String>,
}

impl TryFrom<ActivityRow> for ActivityEntry {
    type Error = Error;

    fn try_from(row: ActivityRow) -> Result<Self> {
        Ok(ActivityEntry {
            id: row.id,
            event_status: row.event_status,
            source: row.source,
            subject_id: row.subject_id,
            message: row.message,
            event: serde_json::from_str(&row.details)?,
            created_at: from_db_time(row.created_at)?,
        })
    }
}

/// Activity repository
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Latest entries first
    pub async fn recent(&self, limit: u32) -> Result<Vec<ActivityEntry>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, event_status, source, subject_id, message, details, created_at
            FROM activity
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list activity: {}", e)))?;

        rows.into_iter().map(ActivityEntry::try_from).collect()
    }
}

#[async_trait]
impl ActivityLog for ActivityRepository {
    async fn record(&self, event: &ExecutionEvent, at: NaiveDateTime) -> Result<()> {
        let details = serde_json::to_string(event)?;

        sqlx::query(
            r#"
            INSERT INTO activity (id, event_status, source, subject_id, message, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Id::new().to_string())
        .bind(event.status())
        .bind(event.source().as_str())
        .bind(event.subject_id())
        .bind(event.message())
        .bind(details)
        .bind(to_db_time(at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to record activity: {}", e)))?;

        Ok(())
    }
}
