//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles all application settings from environment variables and files

use config::{Config as ConfigBuilder, Environment, File};
use ql_ai::AiConfig;
use ql_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(custom(function = "validate_ai"))]
    pub ai: AiConfig,
    #[validate(nested)]
    pub scheduler: SchedulerConfig,
    #[validate(nested)]
    pub generation: GenerationConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub path: String,
    #[validate(range(min = 1, max = 100))]
    pub pool_size: u32,
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "quill.db".to_string(),
            pool_size: 5,
            sqlite_wal: true,
        }
    }
}

/// Executor settings
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Six-field cron expression driving the due-schedule check
    #[validate(custom(function = "validate_cron"))]
    pub tick_cron: String,
    /// Most schedules processed per tick
    #[validate(range(min = 1, max = 100))]
    pub due_batch_size: u32,
    /// How far a one-shot schedule is pushed while its run is in flight
    #[validate(range(min = 1, max = 1440))]
    pub once_retry_minutes: u32,
    pub enable_author_posts: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_cron: "0 * * * * *".to_string(),
            due_batch_size: 5,
            once_retry_minutes: 60,
            enable_author_posts: true,
        }
    }
}

/// Post generation defaults
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct GenerationConfig {
    /// Author used when neither template nor author names one
    #[validate(length(min = 1))]
    pub default_post_author: String,
    /// Related topics added to a topic prompt
    #[validate(range(max = 50))]
    pub expanded_context_limit: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_post_author: "admin".to_string(),
            expanded_context_limit: 5,
        }
    }
}

fn validate_cron(expr: &str) -> std::result::Result<(), ValidationError> {
    cron::Schedule::from_str(expr)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_cron"))
}

fn validate_ai(ai: &AiConfig) -> std::result::Result<(), ValidationError> {
    if ai.timeout_seconds == 0 || ai.timeout_seconds > 600 {
        return Err(ValidationError::new("ai_timeout_out_of_range"));
    }
    if ai.max_retries > 10 {
        return Err(ValidationError::new("ai_max_retries_out_of_range"));
    }
    if ai.model.trim().is_empty() || ai.image_model.trim().is_empty() {
        return Err(ValidationError::new("ai_model_missing"));
    }
    if ai.use_online && ai.api_key.as_deref().map(str::is_empty).unwrap_or(true) {
        return Err(ValidationError::new("ai_api_key_missing"));
    }
    Ok(())
}

/// Variables whose keys contain underscores, which the `_` separator would split
const NESTED_OVERRIDES: &[(&str, &str)] = &[
    ("QUILL_DATABASE_POOL_SIZE", "database.pool_size"),
    ("QUILL_DATABASE_SQLITE_WAL", "database.sqlite_wal"),
    ("QUILL_AI_API_KEY", "ai.api_key"),
    ("QUILL_AI_BASE_URL", "ai.base_url"),
    ("QUILL_AI_TIMEOUT_SECONDS", "ai.timeout_seconds"),
    ("QUILL_AI_MAX_RETRIES", "ai.max_retries"),
    ("QUILL_AI_IMAGE_MODEL", "ai.image_model"),
    ("QUILL_AI_USE_ONLINE", "ai.use_online"),
    ("QUILL_SCHEDULER_TICK_CRON", "scheduler.tick_cron"),
    ("QUILL_SCHEDULER_DUE_BATCH_SIZE", "scheduler.due_batch_size"),
    ("QUILL_SCHEDULER_ONCE_RETRY_MINUTES", "scheduler.once_retry_minutes"),
    ("QUILL_SCHEDULER_ENABLE_AUTHOR_POSTS", "scheduler.enable_author_posts"),
    ("QUILL_GENERATION_DEFAULT_POST_AUTHOR", "generation.default_post_author"),
    ("QUILL_GENERATION_EXPANDED_CONTEXT_LIMIT", "generation.expanded_context_limit"),
];

impl Config {
    /// Load configuration from environment variables and optional .env file
    pub fn load() -> Result<Self> {
        let ai = AiConfig::default();
        let mut builder = ConfigBuilder::builder();

        // Set defaults first
        builder = builder
            .set_default("database.path", "quill.db")?
            .set_default("database.pool_size", 5)?
            .set_default("database.sqlite_wal", true)?
            .set_default("ai.timeout_seconds", ai.timeout_seconds)?
            .set_default("ai.max_retries", ai.max_retries)?
            .set_default("ai.model", ai.model)?
            .set_default("ai.image_model", ai.image_model)?
            .set_default("ai.use_online", ai.use_online)?
            .set_default("scheduler.tick_cron", "0 * * * * *")?
            .set_default("scheduler.due_batch_size", 5)?
            .set_default("scheduler.once_retry_minutes", 60)?
            .set_default("scheduler.enable_author_posts", true)?
            .set_default("generation.default_post_author", "admin")?
            .set_default("generation.expanded_context_limit", 5)?;

        // Try to load from .env file if it exists (optional)
        if std::path::Path::new(".env").exists() {
            builder = builder.add_source(File::with_name(".env").required(false));
        }

        // Load from environment variables with QUILL_ prefix (highest priority)
        builder = builder.add_source(
            Environment::with_prefix("QUILL")
                .try_parsing(true)
                .separator("_"),
        );

        for (var, key) in NESTED_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed
            .validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;

        Ok(parsed)
    }
}
