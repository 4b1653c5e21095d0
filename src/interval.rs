//! Parsing of interval sizes and report range boundaries

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{ReportError, Result};

pub const INVALID_INTERVAL_MSG: &str = "Invalid interval format. Use Nd, Nw, or Nm (e.g., 7d, 2w, 1m)";

/// Days per unit; a month is approximated as 30 days
fn unit_days(unit: char) -> Option<i64> {
    match unit {
        'd' => Some(1),
        'w' => Some(7),
        'm' => Some(30),
        _ => None,
    }
}

/// Parse an interval such as `7d`, `2w` or `1m` into a duration
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim();
    let unit = s.chars().last().ok_or_else(|| ReportError::invalid(INVALID_INTERVAL_MSG))?;
    let days_per_unit = unit_days(unit).ok_or_else(|| ReportError::invalid(INVALID_INTERVAL_MSG))?;

    let count = &s[..s.len() - unit.len_utf8()];
    if count.is_empty() || !count.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReportError::invalid(INVALID_INTERVAL_MSG));
    }

    count
        .parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(days_per_unit))
        .and_then(Duration::try_days)
        .ok_or_else(|| ReportError::invalid(INVALID_INTERVAL_MSG))
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS` as a UTC instant
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    let parsed = if s.contains('T') {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()
    } else {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    };

    parsed.map(|dt| dt.and_utc()).ok_or_else(|| {
        ReportError::invalid(format!(
            "Invalid date '{}'. Use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS",
            s
        ))
    })
}

/// Render a duration as whole days plus a unit suffix the parser accepts
pub fn format_interval(d: Duration) -> String {
    format!("{}d", d.num_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_interval_valid() {
        assert_eq!(parse_interval("7d").unwrap().num_seconds(), 604_800);
        assert_eq!(parse_interval("2w").unwrap().num_days(), 14);
        assert_eq!(parse_interval("1m").unwrap().num_days(), 30);
        assert_eq!(parse_interval(" 3d ").unwrap().num_days(), 3);
    }

    #[test]
    fn test_parse_interval_invalid() {
        for bad in ["5y", "10", "", "d", "-1d", "1.5w", "xm"] {
            let err = parse_interval(bad).unwrap_err();
            assert!(err.is_invalid_argument(), "{} should be rejected", bad);
            assert_eq!(err.to_string(), INVALID_INTERVAL_MSG);
        }
    }

    #[test]
    fn test_parse_interval_overflow() {
        let err = parse_interval("99999999999999999m").unwrap_err();
        assert_eq!(err.to_string(), INVALID_INTERVAL_MSG);
    }

    #[test]
    fn test_parse_datetime_forms() {
        assert_eq!(
            parse_datetime("2024-01-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("2024-12-31T23:59:30").unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 30).unwrap()
        );
        assert!(parse_datetime("31/12/2024").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_format_interval_round_trips_days() {
        let d = parse_interval("2w").unwrap();
        assert_eq!(format_interval(d), "14d");
    }
}
