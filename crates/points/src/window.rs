use time::{Date, Duration, Month, OffsetDateTime, Time, UtcOffset, error::ComponentRange};
use time_tz::{ToTimezone, timezones};

/// A half-open `[start, end)` range of unix seconds. `None` bounds are open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Window {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl Window {
    pub const ALL: Window = Window {
        start: None,
        end: None,
    };

    fn between(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self {
            start: Some(start.unix_timestamp()),
            end: Some(end.unix_timestamp()),
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start.is_none_or(|start| timestamp >= start) && self.end.is_none_or(|end| timestamp < end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarWindows {
    pub day: Window,
    pub week: Window,
    pub month: Window,
}

pub fn is_known_timezone(name: &str) -> bool {
    name.eq_ignore_ascii_case("UTC") || timezones::get_by_name(name).is_some()
}

pub fn to_local(at: OffsetDateTime, timezone: &str) -> OffsetDateTime {
    match timezones::get_by_name(timezone) {
        Some(tz) => at.to_timezone(tz),
        None => at.to_offset(UtcOffset::UTC),
    }
}

/// Day, ISO week (starting Monday) and month containing `at`, aligned to
/// midnight in `timezone`. Unknown zones fall back to UTC.
pub fn calendar_windows(at: OffsetDateTime, timezone: &str) -> Result<CalendarWindows, ComponentRange> {
    let local = to_local(at, timezone);
    let day_start = local.replace_time(Time::MIDNIGHT);
    let week_start =
        day_start - Duration::days(local.weekday().number_days_from_monday().into());
    let month_start = day_start.replace_day(1)?;

    Ok(CalendarWindows {
        day: Window::between(day_start, day_start + Duration::days(1)),
        week: Window::between(week_start, week_start + Duration::weeks(1)),
        month: Window::between(month_start, add_months(month_start, 1)?),
    })
}

/// Calendar month arithmetic; the day is clamped to the target month's length.
pub fn add_months(at: OffsetDateTime, months: u32) -> Result<OffsetDateTime, ComponentRange> {
    let index = at.month() as i64 - 1 + i64::from(months);
    let year = at.year() + (index / 12) as i32;
    let month = Month::try_from((index % 12 + 1) as u8)?;

    let mut day = at.day();
    let date = loop {
        match Date::from_calendar_date(year, month, day) {
            Ok(date) => break date,
            Err(err) if day <= 28 => return Err(err),
            Err(_) => day -= 1,
        }
    };

    Ok(at.replace_date(date))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn utc_windows() {
        // Wednesday
        let at = datetime!(2025-03-12 15:30 UTC);
        let windows = calendar_windows(at, "UTC").unwrap();

        assert_eq!(
            windows.day.start,
            Some(datetime!(2025-03-12 00:00 UTC).unix_timestamp())
        );
        assert_eq!(
            windows.day.end,
            Some(datetime!(2025-03-13 00:00 UTC).unix_timestamp())
        );
        assert_eq!(
            windows.week.start,
            Some(datetime!(2025-03-10 00:00 UTC).unix_timestamp())
        );
        assert_eq!(
            windows.month.start,
            Some(datetime!(2025-03-01 00:00 UTC).unix_timestamp())
        );
        assert_eq!(
            windows.month.end,
            Some(datetime!(2025-04-01 00:00 UTC).unix_timestamp())
        );
        assert!(windows.day.contains(at.unix_timestamp()));
        assert!(!windows.day.contains(windows.day.end.unwrap()));
    }

    #[test]
    fn windows_follow_member_timezone() {
        // 23:30 UTC is already the next day in Tokyo.
        let at = datetime!(2025-03-12 23:30 UTC);
        let windows = calendar_windows(at, "Asia/Tokyo").unwrap();

        assert_eq!(
            windows.day.start,
            Some(datetime!(2025-03-13 00:00 +9).unix_timestamp())
        );
    }

    #[test]
    fn unknown_timezone_is_utc() {
        let at = datetime!(2025-03-12 23:30 UTC);
        assert_eq!(
            calendar_windows(at, "Mars/Olympus").unwrap(),
            calendar_windows(at, "UTC").unwrap()
        );
        assert!(!is_known_timezone("Mars/Olympus"));
        assert!(is_known_timezone("Europe/Paris"));
    }

    #[test]
    fn month_arithmetic_clamps_day() {
        assert_eq!(
            add_months(datetime!(2025-01-31 10:00 UTC), 1).unwrap(),
            datetime!(2025-02-28 10:00 UTC)
        );
        assert_eq!(
            add_months(datetime!(2024-01-31 10:00 UTC), 1).unwrap(),
            datetime!(2024-02-29 10:00 UTC)
        );
        assert_eq!(
            add_months(datetime!(2025-11-15 00:00 UTC), 12).unwrap(),
            datetime!(2026-11-15 00:00 UTC)
        );
        assert_eq!(
            add_months(datetime!(2025-11-15 00:00 UTC), 3).unwrap(),
            datetime!(2026-02-15 00:00 UTC)
        );
    }
}
