//! Relative date resolution and calendar query windows

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::types::{Period, TimeWindow};

/// Hour of day every resolved date is pinned to
pub const DEFAULT_START_HOUR: i64 = 9;

/// Weekday names in scan order
const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

// ============================================================================
// Date Resolution
// ============================================================================

/// Resolve a free-text date hint to a concrete date-time at 09:00.
///
/// The "tomorrow"/"today" literals are checked before any weekday name, so a
/// hint like "today or friday" resolves to today. Unrecognized hints fall
/// back to tomorrow.
pub fn resolve_relative_date(hint: &str, now: NaiveDateTime) -> NaiveDateTime {
    let lower = hint.to_lowercase();
    let today = now.date();

    let date = if lower.contains("tomorrow") {
        today + Days::new(1)
    } else if lower.contains("today") {
        today
    } else if let Some(target) = find_weekday(&lower) {
        next_weekday(today, target)
    } else {
        today + Days::new(1)
    };

    at_start_hour(date)
}

/// First weekday name found in the text, scanning Monday through Sunday
pub fn find_weekday(lower_text: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(name, _)| lower_text.contains(name))
        .map(|(_, day)| *day)
}

/// Find the next occurrence of a weekday (1-7 days from `from`, never 0)
pub fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let current = from.weekday();
    let days_ahead = (target.num_days_from_monday() as i64
        - current.num_days_from_monday() as i64
        + 7) % 7;
    let days_ahead = if days_ahead == 0 { 7 } else { days_ahead as u64 };
    from + Days::new(days_ahead)
}

fn at_start_hour(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::hours(DEFAULT_START_HOUR)
}

// ============================================================================
// Query Windows
// ============================================================================

/// 00:00:00.000 on `date`
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// 23:59:59.999 on `date`
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

/// Compute the time window for a list_events period. An unset period is
/// treated as the current week.
pub fn window_for(period: Option<Period>, now: NaiveDateTime) -> TimeWindow {
    let today = now.date();
    match period {
        Some(Period::Today) => TimeWindow::new(start_of_day(today), end_of_day(today)),
        Some(Period::Tomorrow) => {
            let tomorrow = today + Days::new(1);
            TimeWindow::new(start_of_day(tomorrow), end_of_day(tomorrow))
        }
        Some(Period::Week) | None => TimeWindow::new(start_of_day(today), end_of_week(today)),
    }
}

/// End of the upcoming Sunday; on a Sunday this is the same day
fn end_of_week(today: NaiveDate) -> NaiveDateTime {
    let diff = 6 - today.weekday().num_days_from_monday() as u64;
    end_of_day(today + Days::new(diff))
}

// ============================================================================
// Tests
// ============================================================================
