//! Multi-format timestamp parsing
//!
//! Different backend endpoints (REST history vs. realtime events) emit
//! timestamps in different shapes. Every shape is normalized to a UTC
//! instant so the timeline can order messages from both sources together.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, SessionError};

/// One accepted timestamp shape.
enum Pattern {
    /// Wall-clock time that is already UTC (trailing `Z`, or no zone at all).
    Utc(&'static str),
    /// Time with an explicit numeric offset. Both `+HH:MM` and `+HHMM` are tried.
    Offset(&'static [&'static str]),
    /// Calendar date only, taken as midnight UTC.
    DateOnly(&'static str),
}

/// Accepted shapes, in priority order. The first one that parses wins.
const PATTERNS: &[Pattern] = &[
    Pattern::Utc("%Y-%m-%dT%H:%M:%S%.fZ"),
    Pattern::Utc("%Y-%m-%dT%H:%M:%SZ"),
    Pattern::Offset(&["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"]),
    Pattern::Offset(&["%Y-%m-%dT%H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%z"]),
    Pattern::Utc("%Y-%m-%d %H:%M:%S"),
    Pattern::Utc("%Y-%m-%d %H:%M:%S%.f"),
    Pattern::Utc("%Y-%m-%dT%H:%MZ"),
    Pattern::DateOnly("%Y-%m-%d"),
];

impl Pattern {
    fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        match self {
            Pattern::Utc(fmt) => NaiveDateTime::parse_from_str(text, fmt)
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive)),
            Pattern::Offset(fmts) => fmts.iter().find_map(|fmt| {
                DateTime::parse_from_str(text, fmt)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
            Pattern::DateOnly(fmt) => NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive)),
        }
    }
}

/// Parse a backend timestamp into a UTC instant.
///
/// Fails with [`SessionError::MalformedTimestamp`] when no accepted shape
/// matches; a partial match never yields an instant.
pub fn parse(text: &str) -> Result<DateTime<Utc>> {
    let trimmed = text.trim();
    PATTERNS
        .iter()
        .find_map(|pattern| pattern.parse(trimmed))
        .ok_or_else(|| SessionError::MalformedTimestamp(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_fractional_utc() {
        let dt = parse("2024-03-05T14:30:15.250Z").unwrap();
        assert_eq!(dt.with_nanosecond(0).unwrap(), utc(2024, 3, 5, 14, 30, 15));
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_microsecond_fraction() {
        let dt = parse("2024-03-05T14:30:15.123456Z").unwrap();
        assert_eq!(dt.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn test_plain_utc() {
        assert_eq!(
            parse("2024-03-05T14:30:15Z").unwrap(),
            utc(2024, 3, 5, 14, 30, 15)
        );
    }

    #[test]
    fn test_fractional_with_offset() {
        let dt = parse("2024-03-05T16:30:15.500+02:00").unwrap();
        assert_eq!(dt.with_nanosecond(0).unwrap(), utc(2024, 3, 5, 14, 30, 15));
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_offset_without_fraction() {
        assert_eq!(
            parse("2024-03-05T09:30:15-05:00").unwrap(),
            utc(2024, 3, 5, 14, 30, 15)
        );
        assert_eq!(
            parse("2024-03-05T14:30:15+00:00").unwrap(),
            utc(2024, 3, 5, 14, 30, 15)
        );
    }

    #[test]
    fn test_offset_without_colon() {
        assert_eq!(
            parse("2024-03-05T17:30:15+0300").unwrap(),
            utc(2024, 3, 5, 14, 30, 15)
        );
    }

    #[test]
    fn test_space_separated() {
        assert_eq!(
            parse("2024-03-05 14:30:15").unwrap(),
            utc(2024, 3, 5, 14, 30, 15)
        );
    }

    #[test]
    fn test_space_separated_fractional() {
        let dt = parse("2024-03-05 14:30:15.75").unwrap();
        assert_eq!(dt.with_nanosecond(0).unwrap(), utc(2024, 3, 5, 14, 30, 15));
        assert_eq!(dt.timestamp_subsec_millis(), 750);
    }

    #[test]
    fn test_minutes_only() {
        assert_eq!(parse("2024-03-05T14:30Z").unwrap(), utc(2024, 3, 5, 14, 30, 0));
    }

    #[test]
    fn test_date_only() {
        assert_eq!(parse("2024-03-05").unwrap(), utc(2024, 3, 5, 0, 0, 0));
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(
            parse("  2024-03-05T14:30:15Z\n").unwrap(),
            utc(2024, 3, 5, 14, 30, 15)
        );
    }

    #[test]
    fn test_unsupported_formats() {
        for text in [
            "",
            "yesterday",
            "05/03/2024",
            "1709649015",
            "2024-03-05T14:30:15",
            "2024-13-05T14:30:15Z",
            "2024-03-05T25:30:15Z",
            "2024-03-05T14:30:15Zjunk",
        ] {
            match parse(text) {
                Err(SessionError::MalformedTimestamp(raw)) => assert_eq!(raw, text),
                other => panic!("{:?} should be malformed, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_formats_order_consistently() {
        let earlier = parse("2024-03-05 14:30:15").unwrap();
        let later = parse("2024-03-05T14:30:15.001Z").unwrap();
        assert!(earlier < later);
    }
}
