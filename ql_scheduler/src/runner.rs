//! ABOUTME: Cron-driven loop that runs both executors on every tick
//! ABOUTME: Wraps tokio-cron-scheduler; a tick's failure is logged and the loop keeps going

use crate::{AuthorPostProcessor, BatchReport, ScheduleProcessor};
use chrono::NaiveDateTime;
use ql_core::{local_now, Error, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler as TokioCronScheduler};
use tracing::{error, info};

/// One tick's worth of work: due schedules, then due authors
pub struct Executor {
    schedules: ScheduleProcessor,
    authors: Option<AuthorPostProcessor>,
}

impl Executor {
    pub fn new(schedules: ScheduleProcessor, authors: Option<AuthorPostProcessor>) -> Self {
        Self { schedules, authors }
    }

    pub async fn tick(&self, now: NaiveDateTime) -> Result<BatchReport> {
        let schedule_batch = self.schedules.process_due_schedules(now).await;

        let Some(authors) = &self.authors else {
            return schedule_batch;
        };

        let mut report = match schedule_batch {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Schedule batch failed, continuing with authors");
                BatchReport::default()
            }
        };
        report.merge(authors.process_due_authors(now).await?);
        Ok(report)
    }

    pub fn schedules(&self) -> &ScheduleProcessor {
        &self.schedules
    }

    pub fn authors(&self) -> Option<&AuthorPostProcessor> {
        self.authors.as_ref()
    }
}

/// Runs an [`Executor`] on a six-field cron expression
pub struct CronRunner {
    cron_scheduler: TokioCronScheduler,
    executor: Arc<Executor>,
    expression: String,
}

impl CronRunner {
    pub async fn new(expression: impl Into<String>, executor: Arc<Executor>) -> Result<Self> {
        let cron_scheduler = TokioCronScheduler::new()
            .await
            .map_err(|e| Error::Config(format!("Failed to create cron scheduler: {}", e)))?;

        Ok(Self {
            cron_scheduler,
            executor,
            expression: expression.into(),
        })
    }

    /// Register the tick job and start the scheduler
    pub async fn start(&self) -> Result<()> {
        let executor = Arc::clone(&self.executor);
        let job = CronJob::new_async(self.expression.as_str(), move |_uuid, _l| {
            let executor = Arc::clone(&executor);
            Box::pin(async move {
                let now = local_now();
                match executor.tick(now).await {
                    Ok(report) => info!(
                        processed = report.processed,
                        succeeded = report.succeeded,
                        failed = report.failed,
                        "Tick finished"
                    ),
                    Err(e) => error!(error = %e, "Tick failed"),
                }
            })
        })
        .map_err(|e| Error::Config(format!("Invalid tick cron '{}': {}", self.expression, e)))?;

        self.cron_scheduler
            .add(job)
            .await
            .map_err(|e| Error::Config(format!("Failed to register tick job: {}", e)))?;

        self.cron_scheduler
            .start()
            .await
            .map_err(|e| Error::Config(format!("Failed to start scheduler: {}", e)))?;

        info!(cron = %self.expression, "Executor loop started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.cron_scheduler
            .shutdown()
            .await
            .map_err(|e| Error::Config(format!("Failed to stop scheduler: {}", e)))?;
        info!("Executor loop stopped");
        Ok(())
    }
}
