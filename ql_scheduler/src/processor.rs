//! ABOUTME: Due-schedule executor: claim, build the template context, generate, persist, clean up
//! ABOUTME: Every schedule in a batch is handled independently so one failure never stops the rest

use crate::{ActivityLog, BatchReport, ExecutionEvent, PostStore, RunSource, ScheduleStore};
use chrono::{Duration, NaiveDateTime};
use ql_ai::ContentGenerator;
use ql_context::ContextFactory;
use ql_core::{Error, MonotonicTimer, Result};
use ql_sched::{reschedule_after_fire, Schedule};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Executor settings
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Most schedules claimed per batch
    pub due_batch_size: u32,
    /// How far a one-shot schedule is pushed while its run is in flight
    pub once_retry_minutes: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            due_batch_size: 5,
            once_retry_minutes: 60,
        }
    }
}

/// Runs template schedules whose `next_run` has come
#[derive(Clone)]
pub struct ScheduleProcessor {
    schedules: Arc<dyn ScheduleStore>,
    posts: Arc<dyn PostStore>,
    activity: Arc<dyn ActivityLog>,
    factory: ContextFactory,
    generator: ContentGenerator,
    config: ProcessorConfig,
}

impl ScheduleProcessor {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        posts: Arc<dyn PostStore>,
        activity: Arc<dyn ActivityLog>,
        factory: ContextFactory,
        generator: ContentGenerator,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            schedules,
            posts,
            activity,
            factory,
            generator,
            config,
        }
    }

    /// Process one batch of due schedules
    pub async fn process_due_schedules(&self, now: NaiveDateTime) -> Result<BatchReport> {
        let due = self
            .schedules
            .due_schedules(now, self.config.due_batch_size)
            .await?;

        let mut report = BatchReport::default();
        if due.is_empty() {
            debug!("No scheduled posts due");
            return Ok(report);
        }

        info!(count = due.len(), "Processing due schedules");
        for schedule in due {
            let succeeded = self.execute_claimed(&schedule, now).await;
            report.record(succeeded);
        }

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "Schedule batch finished"
        );
        Ok(report)
    }

    /// Run a schedule by hand. `next_run` is left alone and one-shot
    /// schedules survive the run.
    pub async fn process_single_schedule(&self, id: &str, now: NaiveDateTime) -> Result<String> {
        let schedule = self
            .schedules
            .get_schedule(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Schedule {} not found", id)))?;

        self.emit(
            ExecutionEvent::Started {
                source: RunSource::ManualSchedule,
                subject_id: schedule.id.clone(),
            },
            now,
        )
        .await;

        match self.generate(&schedule, now).await {
            Ok((post_id, title)) => {
                info!(schedule_id = %schedule.id, post_id = %post_id, "Manual schedule run finished");
                self.emit(
                    ExecutionEvent::Completed {
                        source: RunSource::ManualSchedule,
                        subject_id: schedule.id.clone(),
                        post_id: post_id.clone(),
                        title,
                    },
                    now,
                )
                .await;
                Ok(post_id)
            }
            Err(e) => {
                error!(schedule_id = %schedule.id, error = %e, "Manual schedule run failed");
                self.emit(
                    ExecutionEvent::Failed {
                        source: RunSource::ManualSchedule,
                        subject_id: schedule.id.clone(),
                        error: e.to_string(),
                    },
                    now,
                )
                .await;
                Err(e)
            }
        }
    }

    /// Where the claim moves `next_run` before generation starts
    fn claimed_next_run(&self, schedule: &Schedule, now: NaiveDateTime) -> Result<NaiveDateTime> {
        if schedule.is_once() {
            Ok(now + Duration::minutes(i64::from(self.config.once_retry_minutes)))
        } else {
            reschedule_after_fire(&schedule.frequency, schedule.next_run, now)
        }
    }

    /// Claim, run and clean up one schedule. Returns whether a post was produced.
    async fn execute_claimed(&self, schedule: &Schedule, now: NaiveDateTime) -> bool {
        let next_run = match self.claimed_next_run(schedule, now) {
            Ok(next_run) => next_run,
            Err(e) => {
                // A row the calculator cannot advance would be picked up every tick
                error!(schedule_id = %schedule.id, frequency = %schedule.frequency, error = %e, "Cannot compute next run, deactivating schedule");
                if let Err(mark_err) = self.schedules.mark_failed(&schedule.id, now).await {
                    error!(schedule_id = %schedule.id, error = %mark_err, "Failed to deactivate schedule");
                }
                self.emit(
                    ExecutionEvent::Failed {
                        source: RunSource::Schedule,
                        subject_id: schedule.id.clone(),
                        error: e.to_string(),
                    },
                    now,
                )
                .await;
                return false;
            }
        };

        if let Err(e) = self.schedules.update_next_run(&schedule.id, next_run).await {
            error!(schedule_id = %schedule.id, error = %e, "Failed to claim schedule, skipping");
            return false;
        }
        debug!(
            schedule_id = %schedule.id,
            next_run = %ql_core::format_datetime(next_run),
            "Claimed schedule"
        );

        self.emit(
            ExecutionEvent::Started {
                source: RunSource::Schedule,
                subject_id: schedule.id.clone(),
            },
            now,
        )
        .await;

        let result = self.generate(schedule, now).await;
        self.cleanup(schedule, result.is_ok(), now).await;

        match result {
            Ok((post_id, title)) => {
                info!(schedule_id = %schedule.id, post_id = %post_id, "Schedule run finished");
                self.emit(
                    ExecutionEvent::Completed {
                        source: RunSource::Schedule,
                        subject_id: schedule.id.clone(),
                        post_id,
                        title,
                    },
                    now,
                )
                .await;
                true
            }
            Err(e) => {
                error!(schedule_id = %schedule.id, error = %e, "Schedule run failed");
                self.emit(
                    ExecutionEvent::Failed {
                        source: RunSource::Schedule,
                        subject_id: schedule.id.clone(),
                        error: e.to_string(),
                    },
                    now,
                )
                .await;
                false
            }
        }
    }

    async fn generate(&self, schedule: &Schedule, now: NaiveDateTime) -> Result<(String, String)> {
        let timer = MonotonicTimer::new();
        let ctx = self.factory.for_schedule(schedule).await?;
        let post = self.generator.generate(&ctx).await?;
        let post_id = self.posts.save_post(&post, now).await?;
        debug!(
            schedule_id = %schedule.id,
            elapsed_ms = timer.elapsed_ms(),
            "Generated and stored post"
        );
        Ok((post_id, post.title))
    }

    /// One-shot schedules are removed or retired; recurring ones record the run
    async fn cleanup(&self, schedule: &Schedule, succeeded: bool, now: NaiveDateTime) {
        let outcome = if schedule.is_once() {
            if succeeded {
                info!(schedule_id = %schedule.id, "One-time schedule completed and deleted");
                self.schedules.delete_schedule(&schedule.id).await
            } else {
                info!(schedule_id = %schedule.id, "One-time schedule failed and deactivated");
                self.schedules.mark_failed(&schedule.id, now).await
            }
        } else {
            self.schedules.set_last_run(&schedule.id, now).await
        };

        if let Err(e) = outcome {
            error!(schedule_id = %schedule.id, error = %e, "Post-run schedule update failed");
        }
    }

    async fn emit(&self, event: ExecutionEvent, now: NaiveDateTime) {
        if let Err(e) = self.activity.record(&event, now).await {
            warn!(subject_id = %event.subject_id(), error = %e, "Failed to record activity");
        }
    }
}
