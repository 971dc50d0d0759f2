//! ABOUTME: Occurrence projector enumerating a schedule's firings inside a time window
//! ABOUTME: Bounded by a hard iteration cap so malformed rows always terminate

use crate::{interval::step, Frequency, Schedule};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use ql_core::{Error, Result};
use serde::Serialize;
use tracing::warn;

/// Maximum number of loop passes per projected schedule.
///
/// An `hourly` schedule fills the cap after a little over four days, so
/// longer windows come back with `truncated` set.
pub const PROJECTION_SAFETY_CAP: usize = 100;

/// Inclusive time window `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end < start {
            return Err(Error::Validation(format!(
                "Window end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// `[YYYY-MM-01 00:00:00, YYYY-MM-<last> 23:59:59]`
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let invalid = || Error::Validation(format!("Invalid month {}-{:02}", year, month));

        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        let last = next_first.pred_opt().ok_or_else(invalid)?;

        let start = first.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        let end = last.and_hms_opt(23, 59, 59).ok_or_else(invalid)?;
        Self::new(start, end)
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time <= self.end
    }
}

/// Result of projecting one schedule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Projection {
    /// Firing instants in ascending order
    pub occurrences: Vec<NaiveDateTime>,
    /// The safety cap stopped the walk before the window end
    pub truncated: bool,
    /// The frequency tag was not recognised
    pub invalid_frequency: bool,
    /// Fast-forward could not run, so the window start stood in for the cursor
    pub degraded_start: bool,
}

/// A projected firing annotated with its owning schedule, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub schedule_id: String,
    pub template_id: Option<String>,
    pub frequency: String,
    pub at: NaiveDateTime,
}

impl Projection {
    pub fn annotate(&self, schedule: &Schedule) -> Vec<Occurrence> {
        self.occurrences
            .iter()
            .map(|at| Occurrence {
                schedule_id: schedule.id.clone(),
                template_id: schedule.template_id.clone(),
                frequency: schedule.frequency.clone(),
                at: *at,
            })
            .collect()
    }
}

/// Move `cursor` forward by whole periods until it reaches `start`.
///
/// Fixed-length frequencies jump arithmetically; calendar-relative ones walk.
/// Returns `None` if the calendar overflows on the way.
fn fast_forward(
    frequency: Frequency,
    cursor: NaiveDateTime,
    start: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if let Some(step_len) = frequency.fixed_step() {
        let gap = (start - cursor).num_seconds();
        let period = step_len.num_seconds();
        let periods = (gap + period - 1) / period;
        return cursor.checked_add_signed(Duration::seconds(periods.checked_mul(period)?));
    }

    let mut cursor = cursor;
    while cursor < start {
        cursor = frequency.advance(cursor)?;
    }
    Some(cursor)
}

/// Enumerate every firing of `frequency` starting at `next_run` that falls in `window`.
///
/// Never fails: unrecognised frequencies degrade to at most one occurrence at
/// the window start, and the walk stops after [`PROJECTION_SAFETY_CAP`] passes.
pub fn project(frequency: &str, next_run: NaiveDateTime, window: &Window) -> Projection {
    let mut projection = Projection::default();
    let parsed = frequency.parse::<Frequency>().ok();
    projection.invalid_frequency = parsed.is_none();

    let mut cursor = next_run;
    if cursor < window.start {
        match parsed {
            // A one-shot that fired before the window has nothing left to show
            Some(Frequency::Once) => return projection,
            Some(parsed) => match fast_forward(parsed, cursor, window.start) {
                Some(forwarded) => cursor = forwarded,
                None => return projection,
            },
            None => {
                cursor = window.start;
                projection.degraded_start = true;
            }
        }
    }

    let mut iterations = 0;
    while cursor <= window.end && iterations < PROJECTION_SAFETY_CAP {
        if cursor >= window.start {
            projection.occurrences.push(cursor);
        }
        iterations += 1;

        let Some(parsed) = parsed else {
            return projection;
        };
        if parsed.is_terminal() {
            return projection;
        }
        match step(parsed, cursor) {
            Ok(next) => cursor = next,
            Err(_) => return projection,
        }
    }

    projection.truncated = iterations >= PROJECTION_SAFETY_CAP && cursor <= window.end;
    projection
}

/// Project one stored schedule; inactive or never-scheduled rows project nothing.
pub fn project_schedule(schedule: &Schedule, window: &Window) -> Projection {
    if !schedule.is_active {
        return Projection::default();
    }
    let Some(next_run) = schedule.next_run else {
        return Projection::default();
    };

    let projection = project(&schedule.frequency, next_run, window);

    if projection.invalid_frequency {
        warn!(
            schedule_id = %schedule.id,
            frequency = %schedule.frequency,
            degraded_start = projection.degraded_start,
            "Unrecognised frequency, projection stopped early"
        );
    }
    if projection.truncated {
        warn!(
            schedule_id = %schedule.id,
            frequency = %schedule.frequency,
            cap = PROJECTION_SAFETY_CAP,
            "Projection safety cap reached, occurrences truncated"
        );
    }

    projection
}
