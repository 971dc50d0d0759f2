//! ABOUTME: Interval calculator mapping (frequency, base time) to the next firing time
//! ABOUTME: Also provides catch-up and post-fire rescheduling built on the same arithmetic

use crate::Frequency;
use chrono::NaiveDateTime;
use ql_core::{parse_datetime, Error, Result};
use serde::Serialize;
use tracing::debug;

/// Upper bound on whole-period steps taken when catching a schedule up to now
pub const CATCH_UP_LIMIT: usize = 100;

/// One entry of the frequency catalogue, as shown to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalInfo {
    pub tag: String,
    pub display: String,
    pub seconds: i64,
}

/// Advance `base` by exactly one period of `frequency`.
///
/// Unknown tags yield [`Error::InvalidFrequency`]; nothing is computed for them.
///
/// # Examples
///
/// ```
/// use ql_core::parse_datetime;
/// use ql_sched::calculate_next;
///
/// let base = parse_datetime("2025-01-01 09:00:00").unwrap();
/// let next = calculate_next("daily", base).unwrap();
/// assert_eq!(next, parse_datetime("2025-01-02 09:00:00").unwrap());
/// ```
pub fn calculate_next(frequency: &str, base: NaiveDateTime) -> Result<NaiveDateTime> {
    let parsed: Frequency = frequency.parse()?;
    step(parsed, base)
}

/// Same as [`calculate_next`] but with a timestamp-equivalent string base
pub fn calculate_next_str(frequency: &str, base: &str) -> Result<NaiveDateTime> {
    let base = parse_datetime(base)?;
    calculate_next(frequency, base)
}

pub(crate) fn step(frequency: Frequency, base: NaiveDateTime) -> Result<NaiveDateTime> {
    frequency.advance(base).ok_or_else(|| {
        Error::Validation(format!(
            "Advancing {} by {} leaves the supported calendar range",
            ql_core::format_datetime(base),
            frequency
        ))
    })
}

/// First firing strictly after `now` for a newly created schedule.
///
/// With a start time, whole periods are added to it until it passes `now`
/// so the requested phase is kept. Without one, or when the start lies too
/// far back, the result is one period from `now`.
pub fn next_future_run(
    frequency: &str,
    start: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<NaiveDateTime> {
    let parsed: Frequency = frequency.parse()?;

    let Some(start) = start else {
        return step(parsed, now);
    };

    if start > now {
        return Ok(start);
    }

    let mut candidate = start;
    for _ in 0..CATCH_UP_LIMIT {
        candidate = step(parsed, candidate)?;
        if candidate > now {
            return Ok(candidate);
        }
    }

    debug!(frequency = %parsed, "Catch-up limit reached, anchoring on now");
    step(parsed, now)
}

/// New `next_run` for a schedule that just fired.
///
/// Anchors on the previous `next_run` (or `now` when there is none) so the
/// firing phase does not drift with execution latency, then skips whole
/// periods that are already in the past.
pub fn reschedule_after_fire(
    frequency: &str,
    previous_next_run: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<NaiveDateTime> {
    let parsed: Frequency = frequency.parse()?;
    let anchor = previous_next_run.unwrap_or(now);

    let mut next = step(parsed, anchor)?;
    let mut steps = 0;
    while next <= now && steps < CATCH_UP_LIMIT {
        next = step(parsed, next)?;
        steps += 1;
    }

    if next <= now {
        debug!(frequency = %parsed, "Reschedule catch-up exhausted, anchoring on now");
        next = step(parsed, now)?;
    }

    Ok(next)
}

pub fn is_valid_frequency(frequency: &str) -> bool {
    frequency.parse::<Frequency>().is_ok()
}

/// The full frequency catalogue
pub fn intervals() -> Vec<IntervalInfo> {
    Frequency::all()
        .into_iter()
        .map(|frequency| IntervalInfo {
            tag: frequency.tag(),
            display: frequency.display_name(),
            seconds: frequency.interval_seconds(),
        })
        .collect()
}

/// Human-readable name; unknown tags are echoed back unchanged
pub fn interval_display(frequency: &str) -> String {
    frequency
        .parse::<Frequency>()
        .map(|parsed| parsed.display_name())
        .unwrap_or_else(|_| frequency.to_string())
}
