//! Timestamp parsing and timezone adjustment.
//!
//! Callers hand us wall-clock strings ("9am in Karachi") and providers hand
//! back timestamps in a handful of shapes. Everything ends up as a
//! [`DateTime<Utc>`].

use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use thiserror::Error;

/// Naive formats accepted after RFC 3339 fails.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Errors produced by timestamp and timezone handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("unknown timezone: {0:?}")]
    UnknownTimezone(String),
}

/// Looks up an IANA timezone name such as `Asia/Karachi`.
pub fn parse_timezone(name: &str) -> Result<Tz, TimeError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
}

/// Extracts the wall-clock digits of a timestamp string.
///
/// Inputs carrying an explicit offset (`Z`, `+05:00`) are first normalised to
/// UTC, so `2024-12-10T09:00:00+01:00` yields `2024-12-10 08:00:00`. A bare
/// date is read as midnight.
pub fn parse_wall_clock(input: &str) -> Result<NaiveDateTime, TimeError> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| TimeError::InvalidTimestamp(input.to_string()))
}

/// Parses a provider timestamp, treating zone-less values as UTC.
///
/// Handles both `2024-12-10T09:00:00Z` and the seven-digit fractional form
/// `2024-12-10T09:00:00.0000000` returned by Microsoft Graph.
pub fn parse_utc_timestamp(input: &str) -> Result<DateTime<Utc>, TimeError> {
    parse_wall_clock(input).map(|naive| naive.and_utc())
}

/// Reinterprets the wall-clock digits of `wall_clock` as local time in
/// `timezone` and returns the matching UTC instant.
///
/// The offset in effect on that date is used, so DST is honoured. For an
/// ambiguous local time (clocks going back) the earlier instant wins; a local
/// time that does not exist (clocks going forward) uses the offset in effect
/// just before the transition.
///
/// ```
/// use calconnect_core::adjust_time_by_timezone_string;
///
/// let utc = adjust_time_by_timezone_string("2024-12-10T09:00:00", "Asia/Karachi").unwrap();
/// assert_eq!(utc, "2024-12-10T04:00:00Z");
/// ```
pub fn adjust_time_by_timezone(wall_clock: &str, timezone: &str) -> Result<DateTime<Utc>, TimeError> {
    let tz = parse_timezone(timezone)?;
    let naive = parse_wall_clock(wall_clock)?;
    local_to_utc(&tz, naive).ok_or_else(|| TimeError::InvalidTimestamp(wall_clock.to_string()))
}

/// Same as [`adjust_time_by_timezone`], formatted as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn adjust_time_by_timezone_string(wall_clock: &str, timezone: &str) -> Result<String, TimeError> {
    adjust_time_by_timezone(wall_clock, timezone).map(|dt| format_utc(&dt))
}

/// Formats a UTC instant with second precision and a `Z` suffix.
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn local_to_utc(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            // Skipped by a forward transition; transitions never span 3h.
            let before = tz
                .from_local_datetime(&(naive - TimeDelta::hours(3)))
                .earliest()?;
            let offset_secs = i64::from(before.offset().fix().local_minus_utc());
            Some((naive - TimeDelta::seconds(offset_secs)).and_utc())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn karachi_morning_is_four_am_utc() {
        assert_eq!(
            adjust_time_by_timezone_string("2024-12-10T09:00:00", "Asia/Karachi").unwrap(),
            "2024-12-10T04:00:00Z"
        );
    }

    #[test]
    fn utc_timezone_is_identity() {
        assert_eq!(
            adjust_time_by_timezone("2024-12-10T09:00:00", "UTC").unwrap(),
            utc("2024-12-10T09:00:00Z")
        );
    }

    #[test]
    fn explicit_utc_suffix_keeps_wall_clock_digits() {
        assert_eq!(
            adjust_time_by_timezone("2024-12-10T09:00:00.000Z", "Asia/Karachi").unwrap(),
            utc("2024-12-10T04:00:00Z")
        );
    }

    #[test]
    fn explicit_offset_is_normalised_before_reinterpreting() {
        // 09:00+01:00 is 08:00 UTC; 08:00 in Karachi is 03:00 UTC.
        assert_eq!(
            adjust_time_by_timezone("2024-12-10T09:00:00+01:00", "Asia/Karachi").unwrap(),
            utc("2024-12-10T03:00:00Z")
        );
    }

    #[test]
    fn honours_daylight_saving_offsets() {
        // New York: EST (-5) in January, EDT (-4) in July.
        assert_eq!(
            adjust_time_by_timezone("2024-01-15T09:00:00", "America/New_York").unwrap(),
            utc("2024-01-15T14:00:00Z")
        );
        assert_eq!(
            adjust_time_by_timezone("2024-07-15T09:00:00", "America/New_York").unwrap(),
            utc("2024-07-15T13:00:00Z")
        );
    }

    #[test]
    fn ambiguous_local_time_picks_earlier_instant() {
        // 01:30 happens twice on 2024-11-03 in New York; the first is EDT.
        assert_eq!(
            adjust_time_by_timezone("2024-11-03T01:30:00", "America/New_York").unwrap(),
            utc("2024-11-03T05:30:00Z")
        );
    }

    #[test]
    fn skipped_local_time_uses_offset_before_gap() {
        // 02:30 does not exist on 2024-03-10 in New York.
        assert_eq!(
            adjust_time_by_timezone("2024-03-10T02:30:00", "America/New_York").unwrap(),
            utc("2024-03-10T07:30:00Z")
        );
        // 02:30 does not exist on 2024-03-31 in Berlin.
        assert_eq!(
            adjust_time_by_timezone("2024-03-31T02:30:00", "Europe/Berlin").unwrap(),
            utc("2024-03-31T01:30:00Z")
        );
    }

    #[test]
    fn bare_date_is_midnight() {
        assert_eq!(
            adjust_time_by_timezone("2024-12-10", "Asia/Karachi").unwrap(),
            utc("2024-12-09T19:00:00Z")
        );
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert_eq!(
            adjust_time_by_timezone("2024-12-10T09:00:00", "Mars/Olympus"),
            Err(TimeError::UnknownTimezone("Mars/Olympus".into()))
        );
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert_eq!(
            adjust_time_by_timezone("next tuesday", "UTC"),
            Err(TimeError::InvalidTimestamp("next tuesday".into()))
        );
    }

    #[test]
    fn parses_graph_timestamps_as_utc() {
        assert_eq!(
            parse_utc_timestamp("2024-12-10T09:00:00.0000000").unwrap(),
            utc("2024-12-10T09:00:00Z")
        );
        assert_eq!(
            parse_utc_timestamp("2024-12-10T09:00:00Z").unwrap(),
            utc("2024-12-10T09:00:00Z")
        );
        assert_eq!(
            parse_utc_timestamp("2024-12-10T09:00:00-05:00").unwrap(),
            utc("2024-12-10T14:00:00Z")
        );
    }

    #[test]
    fn parse_wall_clock_accepts_short_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 12, 10)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_wall_clock("2024-12-10T09:30").unwrap(), expected);
        assert_eq!(parse_wall_clock("2024-12-10 09:30:00").unwrap(), expected);
        assert_eq!(parse_wall_clock(" 2024-12-10T09:30:00 ").unwrap(), expected);
    }

    #[test]
    fn format_utc_uses_second_precision() {
        assert_eq!(format_utc(&utc("2024-12-10T04:00:00.123Z")), "2024-12-10T04:00:00Z");
    }
}
