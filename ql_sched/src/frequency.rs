//! ABOUTME: Recurrence tags understood by the interval calculator
//! ABOUTME: Parses stored tags and knows how far each one advances a timestamp

use chrono::{Datelike, Duration, Months, NaiveDateTime, Weekday};
use ql_core::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How often a schedule fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    Hourly,
    EveryFourHours,
    EverySixHours,
    /// Every 12 hours; `every_12_hours` parses to this as well
    TwiceDaily,
    Daily,
    /// Fixed +3.5 days, not two fixed weekdays
    TwiceWeekly,
    Weekly,
    BiWeekly,
    /// One calendar month, clamped to the last day of shorter months
    Monthly,
    /// Fires once; projectors stop after the first occurrence
    Once,
    /// Same time of day, on the next given weekday
    Every(Weekday),
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

impl Frequency {
    /// Every recognised frequency, in display order
    pub fn all() -> Vec<Frequency> {
        let mut all = vec![
            Frequency::Hourly,
            Frequency::EveryFourHours,
            Frequency::EverySixHours,
            Frequency::TwiceDaily,
            Frequency::Daily,
            Frequency::TwiceWeekly,
            Frequency::Weekly,
            Frequency::BiWeekly,
            Frequency::Monthly,
            Frequency::Once,
        ];
        all.extend(WEEKDAYS.iter().copied().map(Frequency::Every));
        all
    }

    /// Stored tag, e.g. `twice_daily` or `every_friday`
    pub fn tag(&self) -> String {
        match self {
            Frequency::Hourly => "hourly".to_string(),
            Frequency::EveryFourHours => "every_4_hours".to_string(),
            Frequency::EverySixHours => "every_6_hours".to_string(),
            Frequency::TwiceDaily => "twice_daily".to_string(),
            Frequency::Daily => "daily".to_string(),
            Frequency::TwiceWeekly => "twice_weekly".to_string(),
            Frequency::Weekly => "weekly".to_string(),
            Frequency::BiWeekly => "bi_weekly".to_string(),
            Frequency::Monthly => "monthly".to_string(),
            Frequency::Once => "once".to_string(),
            Frequency::Every(day) => format!("every_{}", weekday_name(*day).to_lowercase()),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Frequency::Hourly => "Hourly".to_string(),
            Frequency::EveryFourHours => "Every 4 Hours".to_string(),
            Frequency::EverySixHours => "Every 6 Hours".to_string(),
            Frequency::TwiceDaily => "Twice Daily".to_string(),
            Frequency::Daily => "Daily".to_string(),
            Frequency::TwiceWeekly => "Twice Weekly".to_string(),
            Frequency::Weekly => "Once Weekly".to_string(),
            Frequency::BiWeekly => "Every 2 Weeks".to_string(),
            Frequency::Monthly => "Monthly".to_string(),
            Frequency::Once => "Once".to_string(),
            Frequency::Every(day) => format!("Every {}", weekday_name(*day)),
        }
    }

    /// Nominal period in seconds, for display and rough capacity maths
    pub fn interval_seconds(&self) -> i64 {
        match self {
            Frequency::Hourly => 3_600,
            Frequency::EveryFourHours => 14_400,
            Frequency::EverySixHours => 21_600,
            Frequency::TwiceDaily => 43_200,
            Frequency::Daily | Frequency::Once => 86_400,
            Frequency::TwiceWeekly => 302_400,
            Frequency::Weekly | Frequency::Every(_) => 604_800,
            Frequency::BiWeekly => 1_209_600,
            Frequency::Monthly => 2_592_000,
        }
    }

    /// Exact step for frequencies that are a fixed duration.
    ///
    /// `None` for calendar-relative frequencies (monthly, weekday).
    pub fn fixed_step(&self) -> Option<Duration> {
        match self {
            Frequency::Hourly => Some(Duration::hours(1)),
            Frequency::EveryFourHours => Some(Duration::hours(4)),
            Frequency::EverySixHours => Some(Duration::hours(6)),
            Frequency::TwiceDaily => Some(Duration::hours(12)),
            Frequency::Daily | Frequency::Once => Some(Duration::days(1)),
            Frequency::TwiceWeekly => Some(Duration::hours(84)),
            Frequency::Weekly => Some(Duration::weeks(1)),
            Frequency::BiWeekly => Some(Duration::weeks(2)),
            Frequency::Monthly | Frequency::Every(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Frequency::Once)
    }

    /// Advance `base` by exactly one period.
    ///
    /// Returns `None` only when the result would overflow the calendar.
    pub fn advance(&self, base: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Frequency::Monthly => base.checked_add_months(Months::new(1)),
            Frequency::Every(day) => {
                let from = base.weekday().num_days_from_monday() as i64;
                let to = day.num_days_from_monday() as i64;
                let mut ahead = (to - from).rem_euclid(7);
                if ahead == 0 {
                    ahead = 7;
                }
                base.checked_add_signed(Duration::days(ahead))
            }
            fixed => fixed
                .fixed_step()
                .and_then(|step| base.checked_add_signed(step)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        let frequency = match tag.as_str() {
            "hourly" => Frequency::Hourly,
            "every_4_hours" => Frequency::EveryFourHours,
            "every_6_hours" => Frequency::EverySixHours,
            "twice_daily" | "every_12_hours" => Frequency::TwiceDaily,
            "daily" => Frequency::Daily,
            "twice_weekly" => Frequency::TwiceWeekly,
            "weekly" => Frequency::Weekly,
            "bi_weekly" => Frequency::BiWeekly,
            "monthly" => Frequency::Monthly,
            "once" => Frequency::Once,
            other => {
                let day = other
                    .strip_prefix("every_")
                    .and_then(|name| {
                        WEEKDAYS
                            .iter()
                            .copied()
                            .find(|day| weekday_name(*day).eq_ignore_ascii_case(name))
                    })
                    .ok_or_else(|| Error::InvalidFrequency(s.to_string()))?;
                Frequency::Every(day)
            }
        };
        Ok(frequency)
    }
}

impl TryFrom<String> for Frequency {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::dt;

    #[test]
    fn test_tags_parse_back() {
        for frequency in Frequency::all() {
            let parsed: Frequency = frequency.tag().parse().unwrap();
            assert_eq!(parsed, frequency);
        }
    }

    #[test]
    fn test_aliases_and_case() {
        assert_eq!("every_12_hours".parse::<Frequency>().unwrap(), Frequency::TwiceDaily);
        assert_eq!(" Daily ".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!(
            "every_Friday".parse::<Frequency>().unwrap(),
            Frequency::Every(Weekday::Fri)
        );
    }

    #[test]
    fn test_unknown_tags_are_invalid() {
        for tag in ["", "fortnightly", "every_", "every_funday", "custom"] {
            assert!(
                matches!(tag.parse::<Frequency>(), Err(Error::InvalidFrequency(_))),
                "{} should be rejected",
                tag
            );
        }
    }

    #[test]
    fn test_serde_uses_tags() {
        let json = serde_json::to_string(&Frequency::Every(Weekday::Tue)).unwrap();
        assert_eq!(json, "\"every_tuesday\"");
        let parsed: Frequency = serde_json::from_str("\"bi_weekly\"").unwrap();
        assert_eq!(parsed, Frequency::BiWeekly);
        assert!(serde_json::from_str::<Frequency>("\"sometimes\"").is_err());
    }

    #[test]
    fn test_weekday_advance_keeps_time() {
        // 2025-01-01 is a Wednesday
        let base = dt("2025-01-01 14:30:00");
        assert_eq!(
            Frequency::Every(Weekday::Fri).advance(base),
            Some(dt("2025-01-03 14:30:00"))
        );
        assert_eq!(
            Frequency::Every(Weekday::Wed).advance(base),
            Some(dt("2025-01-08 14:30:00"))
        );
        assert_eq!(
            Frequency::Every(Weekday::Mon).advance(base),
            Some(dt("2025-01-06 14:30:00"))
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Frequency::Weekly.display_name(), "Once Weekly");
        assert_eq!(Frequency::Every(Weekday::Sun).display_name(), "Every Sunday");
        assert_eq!(Frequency::TwiceWeekly.to_string(), "twice_weekly");
    }
}
