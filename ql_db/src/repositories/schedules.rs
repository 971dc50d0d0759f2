//! ABOUTME: Schedule repository: creation, due lookups and the executor's clock-hand updates
//! ABOUTME: Also serves the template-joined views the calendar is drawn from

use super::parse_column;
use crate::{from_db_time, to_db_time};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_core::{Error, Result};
use ql_sched::{next_future_run, Schedule, ScheduleStatus, ScheduleView};
use ql_scheduler::ScheduleStore;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

#[derive(Debug, FromRow)]
struct ScheduleRow {
    id: String,
    template_id: Option<String>,
    frequency: String,
    next_run: Option<String>,
    last_run: Option<String>,
    is_active: bool,
    status: String,
    topic: Option<String>,
    article_structure_id: Option<String>,
    created_at: Option<String>,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = Error;

    fn try_from(row: ScheduleRow) -> Result<Self> {
        Ok(Schedule {
            id: row.id,
            template_id: row.template_id,
            frequency: row.frequency,
            next_run: from_db_time(row.next_run)?,
            last_run: from_db_time(row.last_run)?,
            is_active: row.is_active,
            status: parse_column::<ScheduleStatus>("status", &row.status)?,
            topic: row.topic,
            article_structure_id: row.article_structure_id,
            created_at: from_db_time(row.created_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ScheduleViewRow {
    #[sqlx(flatten)]
    schedule: ScheduleRow,
    template_name: Option<String>,
    category: Option<String>,
    author: Option<String>,
}

const SELECT_SCHEDULE: &str = r#"
    SELECT s.id, s.template_id, s.frequency, s.next_run, s.last_run, s.is_active, s.status,
           s.topic, s.article_structure_id, s.created_at
    FROM schedules s
"#;

/// Schedule repository
#[derive(Debug, Clone)]
pub struct ScheduleRepository {
    pool: SqlitePool,
}

impl ScheduleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a schedule as given
    pub async fn create(&self, schedule: &Schedule, created_at: NaiveDateTime) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schedules (
                id, template_id, frequency, next_run, last_run, is_active, status,
                topic, article_structure_id, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&schedule.id)
        .bind(&schedule.template_id)
        .bind(&schedule.frequency)
        .bind(schedule.next_run.map(to_db_time))
        .bind(schedule.last_run.map(to_db_time))
        .bind(schedule.is_active)
        .bind(schedule.status.to_string())
        .bind(&schedule.topic)
        .bind(&schedule.article_structure_id)
        .bind(to_db_time(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create schedule: {}", e)))?;

        Ok(())
    }

    /// Insert a schedule whose first run is derived from an optional start time
    pub async fn create_starting(
        &self,
        mut schedule: Schedule,
        start: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Result<Schedule> {
        schedule.next_run = Some(next_future_run(&schedule.frequency, start, now)?);
        self.create(&schedule, now).await?;
        schedule.created_at = Some(now);
        Ok(schedule)
    }

    /// Find schedule by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Schedule>> {
        let query = format!("{} WHERE s.id = ?1", SELECT_SCHEDULE);
        let row = sqlx::query_as::<_, ScheduleRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find schedule: {}", e)))?;

        row.map(Schedule::try_from).transpose()
    }

    /// Active schedules, soonest first
    pub async fn list_active(&self) -> Result<Vec<Schedule>> {
        let query = format!("{} WHERE s.is_active = 1 ORDER BY s.next_run", SELECT_SCHEDULE);
        let rows = sqlx::query_as::<_, ScheduleRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to list schedules: {}", e)))?;

        rows.into_iter().map(Schedule::try_from).collect()
    }

    /// Every schedule joined with its template's display fields
    pub async fn list_views(&self) -> Result<Vec<ScheduleView>> {
        let rows = sqlx::query_as::<_, ScheduleViewRow>(
            r#"
            SELECT s.id, s.template_id, s.frequency, s.next_run, s.last_run, s.is_active, s.status,
                   s.topic, s.article_structure_id, s.created_at,
                   t.name AS template_name, t.post_category AS category, t.post_author AS author
            FROM schedules s
            LEFT JOIN templates t ON t.id = s.template_id
            ORDER BY s.next_run
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list schedule views: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                Ok(ScheduleView {
                    schedule: Schedule::try_from(row.schedule)?,
                    template_name: row.template_name,
                    category: row.category,
                    author: row.author,
                })
            })
            .collect()
    }

    /// Delete schedule
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete schedule: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ScheduleStore for ScheduleRepository {
    async fn due_schedules(&self, now: NaiveDateTime, limit: u32) -> Result<Vec<Schedule>> {
        let query = format!(
            "{} WHERE s.is_active = 1 AND s.next_run IS NOT NULL AND s.next_run <= ?1 ORDER BY s.next_run LIMIT ?2",
            SELECT_SCHEDULE
        );
        let rows = sqlx::query_as::<_, ScheduleRow>(&query)
            .bind(to_db_time(now))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to fetch due schedules: {}", e)))?;

        debug!(count = rows.len(), "Fetched due schedules");
        rows.into_iter().map(Schedule::try_from).collect()
    }

    async fn get_schedule(&self, id: &str) -> Result<Option<Schedule>> {
        self.find_by_id(id).await
    }

    async fn update_next_run(&self, id: &str, next_run: NaiveDateTime) -> Result<()> {
        let result = sqlx::query("UPDATE schedules SET next_run = ?1 WHERE id = ?2")
            .bind(to_db_time(next_run))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update next run: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Schedule {} not found", id)));
        }
        Ok(())
    }

    async fn set_last_run(&self, id: &str, last_run: NaiveDateTime) -> Result<()> {
        sqlx::query("UPDATE schedules SET last_run = ?1 WHERE id = ?2")
            .bind(to_db_time(last_run))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update last run: {}", e)))?;

        Ok(())
    }

    async fn delete_schedule(&self, id: &str) -> Result<()> {
        self.delete(id).await.map(|_| ())
    }

    async fn mark_failed(&self, id: &str, last_run: NaiveDateTime) -> Result<()> {
        sqlx::query("UPDATE schedules SET is_active = 0, status = ?1, last_run = ?2 WHERE id = ?3")
            .bind(ScheduleStatus::Failed.to_string())
            .bind(to_db_time(last_run))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to mark schedule failed: {}", e)))?;

        Ok(())
    }
}
