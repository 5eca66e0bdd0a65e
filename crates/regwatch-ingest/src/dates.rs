//! Loose calendar-date parsing for untyped record fields
//!
//! Upstream feeds mix ISO dates, timestamps and `DD-MM-YYYY` strings, sometimes
//! within one resource. Every value is reduced to a day-granularity
//! [`NaiveDate`]; anything that cannot be read as a real calendar date yields
//! `None`.

use chrono::{DateTime, Datelike, Local, Months, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Date-times without an offset, tried before plain dates
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Whole-string date layouts: ISO, US slashes, and spelled-out months
const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})").expect("day-month-year pattern is valid")
});

static YEAR_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[/-](\d{1,2})[/-](\d{1,2})").expect("year-month-day pattern is valid")
});

/// Parse a record value as a date.
///
/// Only strings are read, through [`parse_loose_str`]; numbers, null,
/// booleans, arrays and objects never hold a date.
pub fn parse_loose(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_loose_str(s),
        _ => None,
    }
}

/// Parse a string as a date, trying in order the standard layouts, a
/// `DD-MM-YYYY` prefix, then a `YYYY-MM-DD` / `YYYY/MM/DD` prefix.
pub fn parse_loose_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    parse_standard(s)
        .or_else(|| parse_day_first(s))
        .or_else(|| parse_year_first(s))
}

fn parse_standard(s: &str) -> Option<NaiveDate> {
    // Offsets are honoured: the calendar day is the one seen on this host.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

fn parse_day_first(s: &str) -> Option<NaiveDate> {
    let caps = DAY_MONTH_YEAR.captures(s)?;
    ymd(&caps[3], &caps[2], &caps[1])
}

fn parse_year_first(s: &str) -> Option<NaiveDate> {
    let caps = YEAR_MONTH_DAY.captures(s)?;
    ymd(&caps[1], &caps[2], &caps[3])
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// First day of the month `months` calendar months before `today`
pub fn month_start_back(today: NaiveDate, months: u32) -> Option<NaiveDate> {
    today
        .checked_sub_months(Months::new(months))
        .and_then(|d| d.with_day(1))
}
