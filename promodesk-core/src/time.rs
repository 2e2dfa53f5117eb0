// SPDX-License-Identifier: MIT

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::Error;

/// Civil zone of every action, whatever the local zone of the machine is.
pub const BUSINESS_TZ: Tz = chrono_tz::Europe::Warsaw;

pub type DateTimeLocal = DateTime<Tz>;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?::(\d{1,2})(?::(\d{1,2}))?)?$").expect("valid time regex"));

struct TimeParts {
    hour: u32,
    minute: u32,
    second: Option<u32>,
}

fn parse_time_parts(input: &str) -> Result<TimeParts, Error> {
    let caps = TIME_RE
        .captures(input.trim())
        .ok_or_else(|| Error::InvalidTimeFormat(input.to_string()))?;

    let component = |i: usize| -> Result<Option<u32>, Error> {
        caps.get(i)
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| Error::InvalidTimeFormat(input.to_string()))
    };

    let hour = component(1)?.unwrap_or_default();
    let minute = component(2)?.unwrap_or_default();
    let second = component(3)?;

    if hour > 23 || minute > 59 || second.is_some_and(|s| s > 59) {
        return Err(Error::InvalidTimeValues(input.to_string()));
    }

    Ok(TimeParts { hour, minute, second })
}

/// Accepts `H`, `H:M` or `H:M:S` and zero-pads every component.
/// Seconds are kept only when they were given.
pub fn normalize_time(input: &str) -> Result<String, Error> {
    let p = parse_time_parts(input)?;
    Ok(match p.second {
        Some(s) => format!("{:02}:{:02}:{s:02}", p.hour, p.minute),
        None => format!("{:02}:{:02}", p.hour, p.minute),
    })
}

/// Same as [`normalize_time`] but always returns `HH:MM:SS`.
pub fn normalize_time_with_seconds(input: &str) -> Result<String, Error> {
    let p = parse_time_parts(input)?;
    Ok(format!(
        "{:02}:{:02}:{:02}",
        p.hour,
        p.minute,
        p.second.unwrap_or_default()
    ))
}

pub fn parse_time(input: &str) -> Result<NaiveTime, Error> {
    let p = parse_time_parts(input)?;
    NaiveTime::from_hms_opt(p.hour, p.minute, p.second.unwrap_or_default())
        .ok_or_else(|| Error::InvalidTimeValues(input.to_string()))
}

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Builds an instant from a `YYYY-MM-DD` date and a `HH:MM[:SS]` time in [`BUSINESS_TZ`].
///
/// Returns `None` when any part is missing or unparseable, and for local times skipped by a DST
/// transition. A repeated local time resolves to the earlier instant.
pub fn combine_date_time(date: Option<&str>, time: Option<&str>) -> Option<DateTimeLocal> {
    let date = parse_date(date?)?;
    let time = parse_time(time?).ok()?;
    date.and_time(time).and_local_timezone(BUSINESS_TZ).earliest()
}

/// `end == start` passes only when a zero-length interval is acceptable for the caller.
pub fn validate_interval(since: &DateTimeLocal, until: &DateTimeLocal, require_positive: bool) -> Result<(), Error> {
    let valid = if require_positive { until > since } else { until >= since };
    if valid {
        return Ok(());
    }

    Err(Error::InvalidInterval {
        since: since.to_rfc3339(),
        until: until.to_rfc3339(),
    })
}

/// ISO-8601 representation exchanged with the backend.
pub fn to_iso(dt: &DateTimeLocal) -> String {
    dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn hours_between(since: &DateTimeLocal, until: &DateTimeLocal) -> f64 {
    let hours = (*until - *since).num_milliseconds() as f64 / 3_600_000.0;
    (hours * 100.0).round() / 100.0
}
