use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Singapore;
use serde::Deserialize;

use crate::error::ApiError;

/// Wire format of `session_datetime`. The submit form sends ISO-8601; some
/// admin clients echo back the textual form they received from the server.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DatetimeFormat {
    #[default]
    Iso8601,
    Textual,
}

const TEXTUAL_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %Z";

/// Parses `raw` according to `format` and normalizes it to Singapore local
/// time (UTC+8), which is the convention for every stored
/// `session_datetime`. The returned value is naive local time.
pub fn parse_session_datetime(
    raw: &str,
    format: DatetimeFormat,
) -> Result<NaiveDateTime, ApiError> {
    let utc = match format {
        DatetimeFormat::Iso8601 => parse_iso8601(raw)?,
        DatetimeFormat::Textual => parse_textual(raw)?,
    };
    Ok(utc.with_timezone(&Singapore).naive_local())
}

/// RFC 3339 with offset (a trailing `Z` means UTC); a bare
/// `YYYY-MM-DDTHH:MM:SS` without offset is taken as UTC.
fn parse_iso8601(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| {
            ApiError::validation(format!("invalid ISO-8601 session_datetime: {raw}"))
        })
}

/// English weekday/month form, e.g. `Mon, 01 Jan 2024 10:00:00 GMT`. The
/// zone name is matched but carries no offset information, so the value is
/// taken as UTC.
fn parse_textual(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    NaiveDateTime::parse_from_str(raw, TEXTUAL_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| {
            ApiError::validation(format!("invalid textual session_datetime: {raw}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sgt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_iso_with_trailing_z() {
        let parsed =
            parse_session_datetime("2024-01-01T10:00:00Z", DatetimeFormat::Iso8601).unwrap();
        assert_eq!(parsed, sgt(2024, 1, 1, 18, 0, 0));
    }

    #[test]
    fn test_iso_with_explicit_offset() {
        let parsed =
            parse_session_datetime("2024-01-01T18:00:00+08:00", DatetimeFormat::Iso8601).unwrap();
        assert_eq!(parsed, sgt(2024, 1, 1, 18, 0, 0));
    }

    #[test]
    fn test_iso_without_offset_is_utc() {
        let parsed =
            parse_session_datetime("2024-06-15T23:30:00", DatetimeFormat::Iso8601).unwrap();
        assert_eq!(parsed, sgt(2024, 6, 16, 7, 30, 0));
    }

    #[test]
    fn test_textual_form() {
        let parsed = parse_session_datetime(
            "Mon, 01 Jan 2024 10:00:00 GMT",
            DatetimeFormat::Textual,
        )
        .unwrap();
        assert_eq!(parsed, sgt(2024, 1, 1, 18, 0, 0));
    }

    #[test]
    fn test_textual_rejected_by_iso_parser() {
        assert!(parse_session_datetime(
            "Mon, 01 Jan 2024 10:00:00 GMT",
            DatetimeFormat::Iso8601
        )
        .is_err());
    }

    #[test]
    fn test_garbage_is_validation_error() {
        let err =
            parse_session_datetime("not a date", DatetimeFormat::Iso8601).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
