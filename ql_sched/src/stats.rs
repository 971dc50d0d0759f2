//! ABOUTME: Pending-run counts per template for capacity planning
//! ABOUTME: Walks each active schedule forward under the projection safety cap

use crate::{interval::step, next_future_run, Frequency, Schedule, PROJECTION_SAFETY_CAP};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Projected firings inside the next day, week and month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingStats {
    /// Up to the end of today
    pub today: u32,
    /// Up to seven days from now
    pub week: u32,
    /// Up to thirty days from now
    pub month: u32,
}

struct Horizons {
    today_end: NaiveDateTime,
    week_end: NaiveDateTime,
    month_end: NaiveDateTime,
}

impl Horizons {
    fn from_now(now: NaiveDateTime) -> Self {
        let today_end = now
            .date()
            .and_hms_opt(23, 59, 59)
            .unwrap_or(now);
        Self {
            today_end,
            week_end: now + Duration::days(7),
            month_end: now + Duration::days(30),
        }
    }
}

fn accumulate(stats: &mut PendingStats, schedule: &Schedule, now: NaiveDateTime, horizons: &Horizons) {
    if !schedule.is_active {
        return;
    }
    let Some(mut cursor) = schedule.next_run else {
        return;
    };
    let frequency = schedule.frequency.parse::<Frequency>().ok();

    let mut iterations = 0;
    while cursor <= horizons.month_end && iterations < PROJECTION_SAFETY_CAP {
        if cursor <= horizons.today_end {
            stats.today += 1;
        }
        if cursor <= horizons.week_end {
            stats.week += 1;
        }
        stats.month += 1;

        let Some(frequency) = frequency else {
            return;
        };
        if frequency.is_terminal() {
            return;
        }
        // An overdue run counts once; missed periods are skipped
        let next = if cursor <= now {
            next_future_run(&schedule.frequency, Some(cursor), now)
        } else {
            step(frequency, cursor)
        };
        match next {
            Ok(next) => cursor = next,
            Err(_) => return,
        }
        iterations += 1;
    }
}

/// Counts keyed by template id; schedules without a template are skipped
pub fn pending_stats(schedules: &[Schedule], now: NaiveDateTime) -> BTreeMap<String, PendingStats> {
    let horizons = Horizons::from_now(now);
    let mut stats: BTreeMap<String, PendingStats> = BTreeMap::new();

    for schedule in schedules {
        let Some(template_id) = schedule.template_id.as_ref() else {
            continue;
        };
        let entry = stats.entry(template_id.clone()).or_default();
        accumulate(entry, schedule, now, &horizons);
    }

    stats
}

/// Counts for a single template
pub fn template_pending_stats(
    schedules: &[Schedule],
    template_id: &str,
    now: NaiveDateTime,
) -> PendingStats {
    let horizons = Horizons::from_now(now);
    let mut stats = PendingStats::default();
    for schedule in schedules
        .iter()
        .filter(|s| s.template_id.as_deref() == Some(template_id))
    {
        accumulate(&mut stats, schedule, now, &horizons);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::dt;

    #[test]
    fn test_daily_counts() {
        let now = dt("2025-01-01 08:00:00");
        let schedules = vec![Schedule::new("tpl-a", "daily").with_next_run(dt("2025-01-01 09:00:00"))];
        let stats = pending_stats(&schedules, now);
        // 01-01 .. 01-08 08:00 -> 7 firings in the week window, 30 in the month
        assert_eq!(
            stats["tpl-a"],
            PendingStats {
                today: 1,
                week: 7,
                month: 30
            }
        );
    }

    #[test]
    fn test_overdue_daily_counts_stale_run_once() {
        let now = dt("2025-01-21 08:00:00");
        let schedules = vec![Schedule::new("tpl-a", "daily").with_next_run(dt("2025-01-01 09:00:00"))];
        let stats = pending_stats(&schedules, now);
        // the stale 01-01 run, then 01-21 09:00 onwards
        assert_eq!(
            stats["tpl-a"],
            PendingStats {
                today: 2,
                week: 8,
                month: 31
            }
        );
    }

    #[test]
    fn test_once_counts_at_most_once() {
        let now = dt("2025-01-01 08:00:00");
        let schedules = vec![
            Schedule::new("tpl-a", "once").with_next_run(dt("2025-01-03 09:00:00")),
            Schedule::new("tpl-a", "once").with_next_run(dt("2025-03-01 09:00:00")),
        ];
        let stats = template_pending_stats(&schedules, "tpl-a", now);
        assert_eq!(stats, PendingStats { today: 0, week: 1, month: 1 });
    }

    #[test]
    fn test_hourly_is_capped() {
        let now = dt("2025-01-01 00:00:00");
        let schedules = vec![Schedule::new("tpl-h", "hourly").with_next_run(now)];
        let stats = pending_stats(&schedules, now);
        assert_eq!(stats["tpl-h"].today, 24);
        assert_eq!(stats["tpl-h"].month, 100);
    }

    #[test]
    fn test_inactive_and_invalid_rows() {
        let now = dt("2025-01-01 00:00:00");
        let schedules = vec![
            Schedule::new("tpl-x", "daily").with_next_run(now).inactive(),
            Schedule::new("tpl-y", "sometimes").with_next_run(now),
        ];
        let stats = pending_stats(&schedules, now);
        assert_eq!(stats["tpl-x"], PendingStats::default());
        assert_eq!(stats["tpl-y"], PendingStats { today: 1, week: 1, month: 1 });
    }
}
