use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::{MealError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Monday of the week containing `date`. Weeks run Monday through Sunday, so
/// a Sunday maps back six days.
#[must_use]
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Sunday of the week containing `date`.
#[must_use]
pub fn end_of_week(date: NaiveDate) -> NaiveDate {
    start_of_week(date) + Duration::days(6)
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Storage unit identifier for the week containing `date`, e.g.
/// `week_2024-06-10_to_2024-06-16`.
#[must_use]
pub fn week_bucket_key(date: NaiveDate) -> String {
    format!(
        "week_{}_to_{}",
        format_date(start_of_week(date)),
        format_date(end_of_week(date))
    )
}

#[must_use]
pub fn same_week(a: NaiveDate, b: NaiveDate) -> bool {
    start_of_week(a) == start_of_week(b)
}

/// Parse `YYYY-MM-DD`, or an RFC 3339 timestamp reduced to its local date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Local).date_naive())
        .map_err(|_| MealError::validation(format!("Invalid date '{s}'. Use YYYY-MM-DD")))
}

pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| MealError::validation(format!("Invalid time '{s}'. Use HH:MM")))
}

/// Epoch milliseconds of `date` at `time` in local time.
///
/// A wall-clock time skipped by a DST jump has no local instant; it is read
/// as UTC instead.
#[must_use]
pub fn entry_timestamp(date: NaiveDate, time: NaiveTime) -> i64 {
    let naive = NaiveDateTime::new(date, time);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc().timestamp_millis(), |dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_start_of_week_weekdays() {
        // 2024-06-10 is a Monday
        assert_eq!(start_of_week(d(2024, 6, 10)), d(2024, 6, 10));
        assert_eq!(start_of_week(d(2024, 6, 12)), d(2024, 6, 10));
        assert_eq!(start_of_week(d(2024, 6, 15)), d(2024, 6, 10));
    }

    #[test]
    fn test_start_of_week_sunday_goes_back() {
        assert_eq!(start_of_week(d(2024, 6, 16)), d(2024, 6, 10));
        assert_eq!(end_of_week(d(2024, 6, 16)), d(2024, 6, 16));
    }

    #[test]
    fn test_week_bucket_key_format() {
        assert_eq!(
            week_bucket_key(d(2024, 6, 12)),
            "week_2024-06-10_to_2024-06-16"
        );
        // Spans a month and a year boundary
        assert_eq!(
            week_bucket_key(d(2025, 1, 1)),
            "week_2024-12-30_to_2025-01-05"
        );
    }

    #[test]
    fn test_week_bucket_key_stable_within_week() {
        let key = week_bucket_key(d(2024, 6, 10));
        for day in 10..=16 {
            assert_eq!(week_bucket_key(d(2024, 6, day)), key);
        }
    }

    #[test]
    fn test_week_bucket_key_sunday_vs_next_monday() {
        assert_ne!(
            week_bucket_key(d(2024, 6, 16)),
            week_bucket_key(d(2024, 6, 17))
        );
        assert!(!same_week(d(2024, 6, 16), d(2024, 6, 17)));
        assert!(same_week(d(2024, 6, 10), d(2024, 6, 16)));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-06-10").unwrap(), d(2024, 6, 10));
        assert_eq!(parse_date(" 2024-06-10 ").unwrap(), d(2024, 6, 10));
        assert!(parse_date("2024-6-1x").is_err());
        assert!(parse_date("").is_err());
        assert!(matches!(
            parse_date("nope"),
            Err(MealError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_date_rfc3339() {
        // Noon UTC lands on the same calendar day in every real time zone
        // offset up to +/-11h.
        assert_eq!(
            parse_date("2024-06-12T12:00:00Z").unwrap(),
            d(2024, 6, 12)
        );
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("07:30").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("07:30:15").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 15).unwrap()
        );
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("breakfast").is_err());
    }

    #[test]
    fn test_entry_timestamp_ordering() {
        let date = d(2024, 6, 10);
        let early = entry_timestamp(date, parse_time("07:30").unwrap());
        let late = entry_timestamp(date, parse_time("08:00").unwrap());
        assert_eq!(late - early, 30 * 60 * 1000);

        let next_day = entry_timestamp(d(2024, 6, 11), parse_time("00:00").unwrap());
        assert!(next_day > late);
    }
}
