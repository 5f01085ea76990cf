//! Timestamp normalizer
//!
//! Joins the `Date` and `Time` cells with a single space and parses the
//! result as a calendar date-time. Slash dates are read month-first, then
//! day-first when the month-first reading is impossible (`13/01/2024`).
//! Dotted dates are day-first.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Full date-time layouts tried against `"<date> <time>"`
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M %p",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d.%m.%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

/// The date/time pair could not be turned into a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date/time: '{date} {time}'")]
pub struct InvalidTimestamp {
    pub date: String,
    pub time: String,
}

/// Normalize a `Date` cell and a `Time` cell into one timestamp.
///
/// Both cells are required. Spreadsheet exports that render the date cell
/// as a midnight date-time (`2024-01-05 00:00:00`) or the time cell as a
/// date-time on a placeholder day are also accepted.
pub fn normalize(date: &str, time: &str) -> Result<NaiveDateTime, InvalidTimestamp> {
    let date = date.trim();
    let time = time.trim();
    let invalid = || InvalidTimestamp {
        date: date.to_string(),
        time: time.to_string(),
    };

    if date.is_empty() || time.is_empty() {
        return Err(invalid());
    }

    let combined = format!("{date} {time}");
    if let Some(ts) = parse_datetime(&combined) {
        return Ok(ts);
    }

    match (parse_date_part(date), parse_time_part(time)) {
        (Some(d), Some(t)) => Ok(d.and_time(t)),
        _ => Err(invalid()),
    }
}

/// ISO-8601 rendering used in logs and on the wire
pub fn to_iso(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_date_part(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

fn parse_time_part(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_datetime(s).map(|dt| dt.time()))
}
