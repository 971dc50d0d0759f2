//! ABOUTME: Schedule records as the calculator, projector and executor see them
//! ABOUTME: Includes the lifecycle status and the display view joined with template data

use chrono::NaiveDateTime;
use ql_core::Id;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a schedule row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    /// A one-shot schedule whose only run failed
    Failed,
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleStatus::Active => write!(f, "active"),
            ScheduleStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ScheduleStatus {
    type Err = ql_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ScheduleStatus::Active),
            "failed" => Ok(ScheduleStatus::Failed),
            other => Err(ql_core::Error::Validation(format!(
                "Unknown schedule status '{}'",
                other
            ))),
        }
    }
}

/// A recurring job definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    /// `None` for topic-driven generation, which runs through authors instead
    pub template_id: Option<String>,
    /// Stored frequency tag; may be unrecognised in malformed rows
    pub frequency: String,
    /// The clock hand: when this schedule fires next
    pub next_run: Option<NaiveDateTime>,
    pub last_run: Option<NaiveDateTime>,
    pub is_active: bool,
    pub status: ScheduleStatus,
    /// Free-text topic overriding the template's
    pub topic: Option<String>,
    pub article_structure_id: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl Schedule {
    /// New active schedule for a template
    pub fn new(template_id: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self {
            id: Id::new().to_string(),
            template_id: Some(template_id.into()),
            frequency: frequency.into(),
            next_run: None,
            last_run: None,
            is_active: true,
            status: ScheduleStatus::Active,
            topic: None,
            article_structure_id: None,
            created_at: None,
        }
    }

    pub fn with_next_run(mut self, next_run: NaiveDateTime) -> Self {
        self.next_run = Some(next_run);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_article_structure(mut self, structure_id: impl Into<String>) -> Self {
        self.article_structure_id = Some(structure_id.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn is_once(&self) -> bool {
        self.frequency.trim().eq_ignore_ascii_case("once")
    }

    /// Active with a `next_run` at or before `now`
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.is_active && self.next_run.map(|next| next <= now).unwrap_or(false)
    }
}

/// A schedule joined with the display fields of its template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleView {
    pub schedule: Schedule,
    pub template_name: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
}

impl ScheduleView {
    pub fn bare(schedule: Schedule) -> Self {
        Self {
            schedule,
            template_name: None,
            category: None,
            author: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::dt;

    #[test]
    fn test_new_schedule_defaults() {
        let schedule = Schedule::new("tpl-1", "daily");
        assert!(schedule.is_active);
        assert_eq!(schedule.status, ScheduleStatus::Active);
        assert_eq!(schedule.template_id.as_deref(), Some("tpl-1"));
        assert_eq!(schedule.id.len(), 26);
        assert!(!schedule.is_once());
    }

    #[test]
    fn test_is_due() {
        let now = dt("2025-01-01 10:00:00");
        let schedule = Schedule::new("tpl-1", "daily");
        assert!(!schedule.is_due(now));

        let due = schedule.clone().with_next_run(dt("2025-01-01 10:00:00"));
        assert!(due.is_due(now));
        assert!(!due.clone().inactive().is_due(now));

        let later = schedule.with_next_run(dt("2025-01-01 10:00:01"));
        assert!(!later.is_due(now));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(ScheduleStatus::Failed.to_string(), "failed");
        assert_eq!("active".parse::<ScheduleStatus>().unwrap(), ScheduleStatus::Active);
        assert!("paused".parse::<ScheduleStatus>().is_err());
    }
}
