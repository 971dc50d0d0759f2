//! Behavioural properties of the interval calculator and occurrence projector

use chrono::Duration;
use ql_core::Error;
use ql_sched::{
    calculate_next, calculate_next_str, intervals, project, reschedule_after_fire, Window,
    PROJECTION_SAFETY_CAP,
};
use test_support::dt;

#[test]
fn every_recognised_frequency_moves_forward() {
    let bases = [
        "2024-02-29 23:30:00",
        "2025-01-31 00:00:00",
        "2025-03-30 01:59:59",
        "2025-12-31 23:59:59",
        "2025-06-15 12:00:00",
    ];
    for info in intervals() {
        for base in bases {
            let base = dt(base);
            let next = calculate_next(&info.tag, base).unwrap();
            assert!(next > base, "{} from {} gave {}", info.tag, base, next);
        }
    }
}

#[test]
fn calculation_is_deterministic() {
    let base = dt("2025-05-17 18:45:00");
    for info in intervals() {
        let first = calculate_next(&info.tag, base).unwrap();
        let second = calculate_next(&info.tag, base).unwrap();
        assert_eq!(first, second, "{}", info.tag);
    }
}

#[test]
fn once_projects_at_most_one_occurrence() {
    let wide = Window::new(dt("2025-01-01 00:00:00"), dt("2030-12-31 23:59:59")).unwrap();
    let projection = project("once", dt("2025-01-01 00:00:00"), &wide);
    assert_eq!(projection.occurrences, vec![dt("2025-01-01 00:00:00")]);
    assert!(!projection.truncated);
}

#[test]
fn hourly_over_thirty_days_hits_the_cap() {
    let start = dt("2025-03-01 00:00:00");
    let window = Window::new(start, start + Duration::days(30)).unwrap();
    let projection = project("hourly", start, &window);
    assert_eq!(projection.occurrences.len(), PROJECTION_SAFETY_CAP);
    assert!(projection.truncated);
    assert_eq!(projection.occurrences[99], dt("2025-03-05 03:00:00"));
}

#[test]
fn late_firing_keeps_the_original_phase() {
    let next = reschedule_after_fire(
        "daily",
        Some(dt("2025-01-01 09:00:00")),
        dt("2025-01-01 09:07:00"),
    )
    .unwrap();
    assert_eq!(next, dt("2025-01-02 09:00:00"));
}

#[test]
fn monthly_from_the_31st_clamps_to_february_end() {
    let next = calculate_next_str("monthly", "2025-01-31 00:00:00").unwrap();
    assert_eq!(next, dt("2025-02-28 00:00:00"));
}

#[test]
fn weekly_march_window_yields_five_saturdays() {
    let window = Window::month(2025, 3).unwrap();
    let projection = project("weekly", dt("2025-03-01 00:00:00"), &window);
    assert_eq!(
        projection.occurrences,
        vec![
            dt("2025-03-01 00:00:00"),
            dt("2025-03-08 00:00:00"),
            dt("2025-03-15 00:00:00"),
            dt("2025-03-22 00:00:00"),
            dt("2025-03-29 00:00:00"),
        ]
    );
}

#[test]
fn unknown_frequency_is_a_recoverable_signal() {
    assert!(matches!(
        calculate_next("quarterly", dt("2025-01-01 00:00:00")),
        Err(Error::InvalidFrequency(_))
    ));

    let window = Window::month(2025, 3).unwrap();
    let projection = project("quarterly", dt("2025-03-10 00:00:00"), &window);
    assert!(projection.invalid_frequency);
    assert_eq!(projection.occurrences.len(), 1);
}
