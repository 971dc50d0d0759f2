//! ABOUTME: Execution events, batch reports and the persistence seams the executors write through
//! ABOUTME: Stores are traits so the SQLite repositories and test fakes are interchangeable

use async_trait::async_trait;
use chrono::NaiveDateTime;
use ql_ai::GeneratedPost;
use ql_core::Result;
use ql_sched::Schedule;
use serde::{Deserialize, Serialize};

/// What triggered a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSource {
    /// A due template schedule
    Schedule,
    /// A schedule run by hand
    ManualSchedule,
    /// A due author picking one of its topics
    Author,
    /// A topic generated by hand
    ManualTopic,
}

impl RunSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunSource::Schedule => "schedule",
            RunSource::ManualSchedule => "manual_schedule",
            RunSource::Author => "author",
            RunSource::ManualTopic => "manual_topic",
        }
    }
}

impl std::fmt::Display for RunSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity emitted while running a schedule or an author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    Started {
        source: RunSource,
        subject_id: String,
    },
    Completed {
        source: RunSource,
        subject_id: String,
        post_id: String,
        title: String,
    },
    Failed {
        source: RunSource,
        subject_id: String,
        error: String,
    },
}

impl ExecutionEvent {
    /// Short status string stored alongside the event
    pub fn status(&self) -> &'static str {
        match self {
            ExecutionEvent::Started { .. } => "started",
            ExecutionEvent::Completed { .. } => "completed",
            ExecutionEvent::Failed { .. } => "failed",
        }
    }

    pub fn source(&self) -> RunSource {
        match self {
            ExecutionEvent::Started { source, .. }
            | ExecutionEvent::Completed { source, .. }
            | ExecutionEvent::Failed { source, .. } => *source,
        }
    }

    /// Id of the schedule, author or topic the event is about
    pub fn subject_id(&self) -> &str {
        match self {
            ExecutionEvent::Started { subject_id, .. }
            | ExecutionEvent::Completed { subject_id, .. }
            | ExecutionEvent::Failed { subject_id, .. } => subject_id,
        }
    }

    /// Human readable line for the activity feed
    pub fn message(&self) -> String {
        match self {
            ExecutionEvent::Started { source, subject_id } => {
                format!("{} {} started", source, subject_id)
            }
            ExecutionEvent::Completed {
                source,
                subject_id,
                title,
                ..
            } => format!("{} {} published \"{}\"", source, subject_id, title),
            ExecutionEvent::Failed {
                source,
                subject_id,
                error,
            } => format!("{} {} failed: {}", source, subject_id, error),
        }
    }
}

/// Outcome counts for one pass over due work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
}

impl BatchReport {
    pub fn record(&mut self, succeeded: bool) {
        self.processed += 1;
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Schedule persistence used by the executor
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Active schedules with `next_run <= now`, earliest first
    async fn due_schedules(&self, now: NaiveDateTime, limit: u32) -> Result<Vec<Schedule>>;

    async fn get_schedule(&self, id: &str) -> Result<Option<Schedule>>;

    async fn update_next_run(&self, id: &str, next_run: NaiveDateTime) -> Result<()>;

    async fn set_last_run(&self, id: &str, last_run: NaiveDateTime) -> Result<()>;

    async fn delete_schedule(&self, id: &str) -> Result<()>;

    /// Deactivate a schedule and mark it failed
    async fn mark_failed(&self, id: &str, last_run: NaiveDateTime) -> Result<()>;
}

/// Destination for generated posts
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a post and return its id
    async fn save_post(&self, post: &GeneratedPost, created_at: NaiveDateTime) -> Result<String>;
}

/// Activity feed
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, event: &ExecutionEvent, at: NaiveDateTime) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_report_counts() {
        let mut report = BatchReport::default();
        report.record(true);
        report.record(false);
        report.record(true);
        assert_eq!(
            report,
            BatchReport {
                processed: 3,
                succeeded: 2,
                failed: 1
            }
        );

        let mut total = BatchReport::default();
        total.merge(report);
        total.merge(report);
        assert_eq!(total.processed, 6);
        assert_eq!(total.failed, 2);
    }

    #[test]
    fn test_event_accessors() {
        let event = ExecutionEvent::Failed {
            source: RunSource::Schedule,
            subject_id: "s1".to_string(),
            error: "template gone".to_string(),
        };
        assert_eq!(event.status(), "failed");
        assert_eq!(event.source(), RunSource::Schedule);
        assert_eq!(event.subject_id(), "s1");
        assert_eq!(event.message(), "schedule s1 failed: template gone");
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = ExecutionEvent::Started {
            source: RunSource::ManualTopic,
            subject_id: "t1".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "started");
        assert_eq!(json["source"], "manual_topic");
    }
}
