//! ABOUTME: Application wiring shared by the quill binary and its tests
//! ABOUTME: Opens storage, builds the executors and answers calendar and capacity queries

use chrono::NaiveDateTime;
use ql_ai::{create_client, ContentGenerator};
use ql_config::Config;
use ql_context::ContextFactory;
use ql_core::Result;
use ql_db::{Db, DbOptions};
use ql_sched::{month_events, pending_stats, template_pending_stats, CalendarEvent, PendingStats};
use ql_scheduler::{AuthorPostProcessor, Executor, ProcessorConfig, ScheduleProcessor};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Open the configured database, running migrations
pub async fn open_db(config: &Config) -> Result<Db> {
    let db = Db::with_options(
        &config.database.path,
        DbOptions {
            pool_size: config.database.pool_size,
            sqlite_wal: config.database.sqlite_wal,
        },
    )
    .await?;
    db.health_check().await?;
    Ok(db)
}

/// Context factory over the database repositories
pub fn context_factory(config: &Config, db: &Db) -> ContextFactory {
    ContextFactory::new(
        Arc::new(db.templates()),
        Arc::new(db.voices()),
        Arc::new(db.authors()),
        Arc::new(db.topics()),
    )
    .with_default_author(config.generation.default_post_author.clone())
    .with_expanded_context_limit(config.generation.expanded_context_limit as usize)
}

/// Both executors wired to the database and the configured AI client
pub fn build_executor(config: &Config, db: &Db) -> Result<Executor> {
    let client = create_client(config.ai.clone())?;
    let generator = ContentGenerator::new(Arc::from(client));
    let factory = context_factory(config, db);

    let schedules = ScheduleProcessor::new(
        Arc::new(db.schedules()),
        Arc::new(db.posts()),
        Arc::new(db.activity()),
        factory.clone(),
        generator.clone(),
        ProcessorConfig {
            due_batch_size: config.scheduler.due_batch_size,
            once_retry_minutes: config.scheduler.once_retry_minutes,
        },
    );

    let authors = config.scheduler.enable_author_posts.then(|| {
        AuthorPostProcessor::new(
            Arc::new(db.authors()),
            Arc::new(db.topics()),
            Arc::new(db.posts()),
            Arc::new(db.activity()),
            factory,
            generator,
        )
    });

    info!(
        batch_size = config.scheduler.due_batch_size,
        author_posts = config.scheduler.enable_author_posts,
        online_ai = config.ai.use_online,
        "Executor ready"
    );
    Ok(Executor::new(schedules, authors))
}

/// Calendar events for one month
pub async fn calendar(db: &Db, year: i32, month: u32) -> Result<Vec<CalendarEvent>> {
    let views = db.schedules().list_views().await?;
    month_events(&views, year, month)
}

/// Per-template pending counts, or the counts of one template
pub async fn pending(
    db: &Db,
    template_id: Option<&str>,
    now: NaiveDateTime,
) -> Result<BTreeMap<String, PendingStats>> {
    let schedules = db.schedules().list_active().await?;
    Ok(match template_id {
        Some(id) => BTreeMap::from([(id.to_string(), template_pending_stats(&schedules, id, now))]),
        None => pending_stats(&schedules, now),
    })
}
