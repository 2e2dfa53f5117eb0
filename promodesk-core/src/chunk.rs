// SPDX-License-Identifier: MIT

use chrono::TimeDelta;

use crate::{
    Error,
    time::{DateTimeLocal, hours_between, validate_interval},
};

pub const DEFAULT_MAX_HOURS: f64 = 4.0;

/// A non-empty `[since, until)` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    since: DateTimeLocal,
    until: DateTimeLocal,
}

impl TimeInterval {
    pub fn new(since: DateTimeLocal, until: DateTimeLocal) -> Result<Self, Error> {
        validate_interval(&since, &until, true)?;
        Ok(Self { since, until })
    }

    pub fn since(&self) -> DateTimeLocal {
        self.since
    }

    pub fn until(&self) -> DateTimeLocal {
        self.until
    }

    pub fn duration(&self) -> TimeDelta {
        self.until - self.since
    }

    pub fn hours(&self) -> f64 {
        hours_between(&self.since, &self.until)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub since: DateTimeLocal,
    pub until: DateTimeLocal,
    pub duration_hours: f64,
}

pub fn ordinal_label(ordinal: usize, name: &str) -> String {
    format!("[{ordinal}] {name}")
}

fn max_duration(max_hours: f64) -> Result<TimeDelta, Error> {
    let invalid = || Error::InvalidChunkSize(max_hours.to_string());

    if !max_hours.is_finite() || max_hours <= 0.0 {
        return Err(invalid());
    }

    TimeDelta::try_milliseconds((max_hours * 3_600_000.0).round() as i64)
        .filter(|d| *d > TimeDelta::zero())
        .ok_or_else(invalid)
}

/// Splits the interval into contiguous pieces no longer than `max_hours`.
/// Only the last piece may be shorter, and it always ends exactly at `interval.until()`.
pub fn chunk(interval: &TimeInterval, max_hours: f64) -> Result<Vec<Chunk>, Error> {
    let max = max_duration(max_hours)?;

    let mut result = Vec::new();
    let mut cursor = interval.since;
    while cursor < interval.until {
        let candidate_end = cursor.checked_add_signed(max).unwrap_or(interval.until);
        let chunk_end = candidate_end.min(interval.until);
        result.push(Chunk {
            since: cursor,
            until: chunk_end,
            duration_hours: hours_between(&cursor, &chunk_end),
        });
        cursor = chunk_end;
    }

    tracing::debug!(
        target: "chunk",
        since=?interval.since,
        until=?interval.until,
        max_hours=max_hours,
        count=result.len(),
        "Split the interval"
    );

    Ok(result)
}
