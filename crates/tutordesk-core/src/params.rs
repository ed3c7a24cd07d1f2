//! Parsing for raw query parameters.
//!
//! List endpoints receive their filters as optional strings. These helpers turn
//! them into typed values and report malformed input as `InvalidArgument`
//! naming the offending parameter, never as a silently empty result.
//!
//! Dates accept the following forms, all interpreted as UTC when no offset is given:
//!
//! - `2025-01-01` (midnight)
//! - `2025-01-01T09:30:00` / `2025-01-01 09:30:00`
//! - RFC 3339, e.g. `2025-01-01T09:30:00+02:00`
//!
//! Flags accept `true`/`false` (any case) and `1`/`0`.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::errors::AppError;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn parse_datetime_param(name: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(invalid(name, value))
}

pub fn parse_date_param(name: &str, value: &str) -> Result<NaiveDate, AppError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| parse_datetime_param(name, value).map(|dt| dt.date_naive()))
        .map_err(|_| invalid(name, value))
}

pub fn parse_flag_param(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AppError::bad_request(anyhow!(
            "Invalid {name} '{value}': expected true or false"
        ))),
    }
}

pub fn parse_int_param(name: &str, value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(anyhow!("Invalid {name} '{value}': expected an integer")))
}

fn invalid(name: &str, value: &str) -> AppError {
    AppError::bad_request(anyhow!(
        "Invalid {name} '{value}': expected YYYY-MM-DD or an RFC 3339 timestamp"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use chrono::TimeZone;

    #[test]
    fn test_plain_date_is_midnight_utc() {
        let dt = parse_datetime_param("start", "2025-01-01").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_rfc3339_is_normalized() {
        let dt = parse_datetime_param("start", "2025-01-01T10:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_naive_datetime() {
        let dt = parse_datetime_param("end", "2025-03-04T05:06:07").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap());
        let dt = parse_datetime_param("end", "2025-03-04 05:06:07").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap());
    }

    #[test]
    fn test_malformed_is_invalid_argument() {
        let err = parse_datetime_param("start", "01/02/2025").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("start"));

        let err = parse_datetime_param("end", "2025-13-40").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag_param("group", "true").unwrap());
        assert!(parse_flag_param("group", "TRUE").unwrap());
        assert!(parse_flag_param("group", "1").unwrap());
        assert!(!parse_flag_param("group", "false").unwrap());
        assert!(!parse_flag_param("group", "0").unwrap());

        let err = parse_flag_param("is_in_group", "maybe").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("is_in_group"));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int_param("range_length", " 14 ").unwrap(), 14);
        assert_eq!(parse_int_param("range_length", "-1").unwrap(), -1);
        assert!(parse_int_param("range_length", "seven").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date_param("started_after", "2024-09-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
        );
        assert_eq!(
            parse_date_param("started_after", "2024-09-01T23:00:00Z").unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
        );
        assert!(parse_date_param("started_after", "yesterday").is_err());
    }
}
