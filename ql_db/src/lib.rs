//! ABOUTME: Database layer with SQLite, migrations, and repositories
//! ABOUTME: Handles all data persistence and database operations

use chrono::NaiveDateTime;
use ql_core::{format_datetime, parse_datetime, Error, Result};
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Row, Sqlite, SqlitePool,
};
use tracing::{debug, info, instrument};

/// Tables reported by [`Db::stats`]
const STAT_TABLES: &[&str] = &[
    "templates",
    "voices",
    "schedules",
    "authors",
    "author_topics",
    "posts",
    "activity",
];

/// Connection settings
#[derive(Debug, Clone)]
pub struct DbOptions {
    pub pool_size: u32,
    pub sqlite_wal: bool,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            pool_size: 5,
            sqlite_wal: true,
        }
    }
}

/// Database connection pool and operations
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if needed) and migrate the database with default options
    pub async fn new(db_path: &str) -> Result<Self> {
        Self::with_options(db_path, DbOptions::default()).await
    }

    /// Open (creating if needed) and migrate the database
    #[instrument(skip(db_path))]
    pub async fn with_options(db_path: &str, options: DbOptions) -> Result<Self> {
        info!("Initializing database at: {}", db_path);

        let database_url = format!("sqlite://{}", db_path);
        if !Sqlite::database_exists(&database_url)
            .await
            .unwrap_or(false)
        {
            info!("Creating database: {}", database_url);
            Sqlite::create_database(&database_url)
                .await
                .map_err(|e| Error::Database(format!("Failed to create database: {}", e)))?;
        }

        let journal_mode = if options.sqlite_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };

        let connect_options = SqliteConnectOptions::new()
            .filename(db_path)
            .journal_mode(journal_mode)
            .create_if_missing(true)
            .pragma("foreign_keys", "ON")
            .pragma("synchronous", "NORMAL")
            .pragma("busy_timeout", "30000");

        let pool = SqlitePoolOptions::new()
            .max_connections(options.pool_size)
            .min_connections(1)
            .connect_with(connect_options)
            .await
            .map_err(|e| Error::Database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        info!("Database initialized successfully");
        Ok(db)
    }

    /// Run database migrations
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Migration failed: {}", e)))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection, releasing the database file
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Check database health
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing database health check");

        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Health check failed: {}", e)))?;

        debug!("Database health check passed");
        Ok(())
    }

    /// Row counts per table
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let mut table_counts = std::collections::HashMap::new();

        for &table in STAT_TABLES {
            // Table names come from the constant above, never from input
            let query = format!("SELECT COUNT(*) as count FROM {}", table);
            let row = sqlx::query(&query)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(format!("Failed to get count for {}: {}", table, e))
                })?;

            let count: i64 = row.get("count");
            table_counts.insert(table.to_string(), count);
        }

        Ok(DatabaseStats { table_counts })
    }

    pub fn templates(&self) -> TemplateRepository {
        TemplateRepository::new(self.pool.clone())
    }

    pub fn voices(&self) -> VoiceRepository {
        VoiceRepository::new(self.pool.clone())
    }

    pub fn schedules(&self) -> ScheduleRepository {
        ScheduleRepository::new(self.pool.clone())
    }

    pub fn authors(&self) -> AuthorRepository {
        AuthorRepository::new(self.pool.clone())
    }

    pub fn topics(&self) -> TopicRepository {
        TopicRepository::new(self.pool.clone())
    }

    pub fn posts(&self) -> PostRepository {
        PostRepository::new(self.pool.clone())
    }

    pub fn activity(&self) -> ActivityRepository {
        ActivityRepository::new(self.pool.clone())
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseStats {
    pub table_counts: std::collections::HashMap<String, i64>,
}

pub(crate) fn to_db_time(time: NaiveDateTime) -> String {
    format_datetime(time)
}

pub(crate) fn from_db_time(value: Option<String>) -> Result<Option<NaiveDateTime>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_datetime(text).map(Some),
    }
}

pub mod repositories;

pub use repositories::{
    activity::{ActivityEntry, ActivityRepository},
    authors::AuthorRepository,
    posts::{PostRepository, StoredPost},
    schedules::ScheduleRepository,
    templates::TemplateRepository,
    topics::TopicRepository,
    voices::VoiceRepository,
};
