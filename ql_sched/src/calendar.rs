//! ABOUTME: Calendar month view built from projected schedule occurrences
//! ABOUTME: Display only; fills template, category and author fallbacks

use crate::{interval_display, project_schedule, ScheduleView, Window};
use chrono::NaiveDateTime;
use ql_core::Result;
use serde::Serialize;

pub const UNKNOWN_TEMPLATE: &str = "Unknown Template";
pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_AUTHOR: &str = "AI Generated";

/// One projected firing, shaped for a calendar widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub schedule_id: String,
    pub title: String,
    #[serde(with = "event_time")]
    pub start: NaiveDateTime,
    pub template_id: Option<String>,
    pub template_name: Option<String>,
    pub frequency: String,
    pub frequency_label: String,
    pub topic: Option<String>,
    pub category: String,
    pub author: String,
    /// The owning schedule hit the projection cap this month
    pub truncated: bool,
}

mod event_time {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ql_core::format_datetime(*time))
    }
}

/// The inclusive window covering a whole month
pub fn month_window(year: i32, month: u32) -> Result<Window> {
    Window::month(year, month)
}

/// Every occurrence of every active schedule in the month, ordered by start
pub fn month_events(schedules: &[ScheduleView], year: i32, month: u32) -> Result<Vec<CalendarEvent>> {
    let window = month_window(year, month)?;
    let mut events = Vec::new();

    for view in schedules {
        let schedule = &view.schedule;
        let projection = project_schedule(schedule, &window);

        let title = view
            .template_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_TEMPLATE.to_string());
        let category = view
            .category
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let frequency_label = interval_display(&schedule.frequency);
        let author = view
            .author
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        events.extend(projection.occurrences.iter().map(|start| CalendarEvent {
            schedule_id: schedule.id.clone(),
            title: title.clone(),
            start: *start,
            template_id: schedule.template_id.clone(),
            template_name: view.template_name.clone(),
            frequency: schedule.frequency.clone(),
            frequency_label: frequency_label.clone(),
            topic: schedule.topic.clone(),
            category: category.clone(),
            author: author.clone(),
            truncated: projection.truncated,
        }));
    }

    events.sort_by(|a, b| a.start.cmp(&b.start));
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Schedule;
    use test_support::dt;

    #[test]
    fn test_events_sorted_with_fallbacks() {
        let weekly = ScheduleView {
            schedule: Schedule::new("tpl-1", "weekly").with_next_run(dt("2025-03-01 00:00:00")),
            template_name: Some("Weekly Roundup".to_string()),
            category: Some("News".to_string()),
            author: Some("Ada".to_string()),
        };
        let once = ScheduleView::bare(
            Schedule::new("tpl-2", "once")
                .with_next_run(dt("2025-03-05 12:00:00"))
                .with_topic("Spring launch"),
        );

        let events = month_events(&[weekly, once], 2025, 3).unwrap();
        assert_eq!(events.len(), 6);
        assert!(events.windows(2).all(|pair| pair[0].start <= pair[1].start));

        let launch = events.iter().find(|e| e.frequency == "once").unwrap();
        assert_eq!(launch.title, UNKNOWN_TEMPLATE);
        assert_eq!(launch.category, DEFAULT_CATEGORY);
        assert_eq!(launch.author, DEFAULT_AUTHOR);
        assert_eq!(launch.topic.as_deref(), Some("Spring launch"));
        assert_eq!(events[2].start, dt("2025-03-08 00:00:00"));
        assert_eq!(events[0].title, "Weekly Roundup");
        assert_eq!(events[0].frequency_label, "Once Weekly");
    }

    #[test]
    fn test_invalid_month() {
        assert!(month_events(&[], 2025, 13).is_err());
    }

    #[test]
    fn test_event_serializes_canonical_time() {
        let view = ScheduleView::bare(
            Schedule::new("tpl", "daily").with_next_run(dt("2025-02-27 06:00:00")),
        );
        let events = month_events(&[view], 2025, 2).unwrap();
        assert_eq!(events.len(), 2);
        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["start"], "2025-02-27 06:00:00");
        assert_eq!(json["truncated"], false);
    }
}
