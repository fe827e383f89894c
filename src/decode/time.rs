use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::FieldError;

/// Largest gap between consecutive timestamps still taken as the interval.
pub const MAX_INFERRED_INTERVAL_SECS: i64 = 300;

/// Formats with an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Formats without an offset; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S%.fZ",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Epoch and interval derived from one record's timestamp column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedTime {
    pub epoch: Option<i64>,
    pub interval: Option<u64>,
}

impl ResolvedTime {
    /// Fill in `default` as the interval when an epoch is known but no
    /// interval could be inferred.
    pub fn or_default_interval(self, default: u64) -> Self {
        match (self.epoch, self.interval) {
            (Some(_), None) => Self {
                interval: Some(default),
                ..self
            },
            _ => self,
        }
    }
}

/// Turns timestamp fields into epoch seconds and infers the sampling interval
/// from the previous timestamp of the stream.
#[derive(Debug, Default)]
pub struct TimeResolver {
    last_epoch: Option<i64>,
}

impl TimeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve one timestamp field.
    ///
    /// On success the epoch becomes the reference for the next call. A parse
    /// failure leaves the reference untouched.
    pub fn resolve(&mut self, raw: &str) -> Result<ResolvedTime, FieldError> {
        let epoch = parse_datetime(raw)
            .map(|dt| epoch_seconds(&dt))
            .ok_or_else(|| FieldError::Timestamp {
                raw: raw.to_string(),
            })?;

        let interval = self
            .last_epoch
            .map(|last| epoch - last)
            .filter(|delta| *delta > 0 && *delta <= MAX_INFERRED_INTERVAL_SECS)
            .map(|delta| delta as u64);

        self.last_epoch = Some(epoch);

        Ok(ResolvedTime {
            epoch: Some(epoch),
            interval,
        })
    }

    pub fn last_epoch(&self) -> Option<i64> {
        self.last_epoch
    }

    pub fn reset(&mut self) {
        self.last_epoch = None;
    }
}

/// Parse a date-time in any of the accepted layouts.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole seconds since 1970-01-01T00:00:00Z, truncated toward zero.
pub fn epoch_seconds(dt: &DateTime<Utc>) -> i64 {
    let secs = dt.timestamp();
    if secs < 0 && dt.timestamp_subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
