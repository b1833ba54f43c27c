//! Date and time parsing shared by the backends and the CLI.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::DatastoreError;

/// Canonical timestamp format used when timestamps travel as text.
///
/// Fractional seconds are printed only when present, so whole-second
/// timestamps keep the plain `YYYY-MM-DD HH:MM:SS` form.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Canonical time-of-day format used when opening hours travel as text.
pub const TIME_FORMAT: &str = "%H:%M:%S";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(text: &str) -> Result<NaiveDate, DatastoreError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| DatastoreError::InvalidTimestamp(format!("'{}': {}", text, e)))
}

/// Parses a timestamp with either a space or `T` separator, optional seconds
/// and optional fractional seconds.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, DatastoreError> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .ok_or_else(|| DatastoreError::InvalidTimestamp(format!("'{}'", text)))
}

/// Parses a time of day in `HH:MM:SS` or `HH:MM` form.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, DatastoreError> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|e| DatastoreError::InvalidTimestamp(format!("'{}': {}", text, e)))
}

/// Formats a timestamp in [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Formats a time of day in [`TIME_FORMAT`].
pub fn format_time_of_day(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Returns the half-open 24-hour window `[date 00:00, date+1 00:00)`.
pub fn day_window(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(NaiveTime::MIN);
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2024-01-01 10:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:00").unwrap(), expected);
        assert_eq!(parse_timestamp(" 2024-01-01 10:00 ").unwrap(), expected);
        assert!(parse_timestamp("01/01/2024 10:00").is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        let expected = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
        assert_eq!(parse_time_of_day("06:30:00").unwrap(), expected);
        assert_eq!(parse_time_of_day("06:30").unwrap(), expected);
        assert!(parse_time_of_day("25:00").is_err());
    }

    #[test]
    fn test_day_window_is_half_open() {
        let (start, end) = day_window(parse_date("2024-01-01").unwrap());
        let inside = parse_timestamp("2024-01-01T08:00").unwrap();
        let before = parse_timestamp("2023-12-31T23:59").unwrap();
        let next_midnight = parse_timestamp("2024-01-02T00:00").unwrap();

        assert!(start <= inside && inside < end);
        assert!(before < start);
        assert_eq!(next_midnight, end);
    }

    #[test]
    fn test_format_round_trip() {
        let ts = parse_timestamp("2024-03-05 07:08:09").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-05 07:08:09");
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_fractional_seconds_survive_formatting() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_micro_opt(10, 0, 0, 250_000)
            .unwrap();
        let text = format_timestamp(&ts);

        assert_eq!(text, "2024-01-01 10:00:00.250");
        assert_eq!(parse_timestamp(&text).unwrap(), ts);
        assert_eq!(
            parse_timestamp("2024-01-01T10:00:00.000123").unwrap(),
            ts.with_nanosecond(123_000).unwrap()
        );
    }
}
