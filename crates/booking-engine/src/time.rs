//! Wall-clock helpers: DST resolution, timestamp parsing, calendar windows.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Policy for recurring instances whose local start falls into a DST gap
/// (e.g. 02:30 on a spring-forward night).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Drop the instance for that day.
    Skip,
    /// Move the instance to the first valid time after the gap (02:30 -> 03:00).
    #[default]
    ShiftForward,
}

const MAX_GAP_MINUTES: i64 = 4 * 60;

/// Resolve a local wall-clock time in `tz` to an absolute instant.
///
/// Ambiguous times (fall-back overlap) take the earlier instant. Times inside a
/// gap follow `policy`; `None` means the instance should be skipped.
pub fn resolve_local(tz: Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => {
                // Transitions fall on whole minutes and gaps are at most a
                // few hours wide, so the first valid minute is the gap's end.
                let floor = local.with_second(0)?.with_nanosecond(0)?;
                (1..=MAX_GAP_MINUTES).find_map(|minute| {
                    tz.from_local_datetime(&(floor + Duration::minutes(minute)))
                        .earliest()
                        .map(|dt| dt.with_timezone(&Utc))
                })
            }
        },
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| BookingError::InvalidTimezone(name.to_string()))
}

/// Parse a timestamp string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (`2026-02-17T14:00:00+01:00`) and naive datetimes
/// (`2026-02-17T14:00:00`), which are interpreted as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| BookingError::Validation(format!("invalid timestamp '{}': {}", s, e)))
}

/// The calendar year containing `now`, as seen in `tz`: `[Jan 1 00:00, next Jan 1 00:00)`.
///
/// This is the default rendering window for recurring events.
pub fn year_window(now: DateTime<Utc>, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let year = now.with_timezone(&tz).year();
    (start_of_year(year, tz), start_of_year(year + 1, tz))
}

fn start_of_year(year: i32, tz: Tz) -> DateTime<Utc> {
    let midnight = NaiveDate::from_ymd_opt(year, 1, 1)
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN);
    resolve_local(tz, midnight, DstPolicy::ShiftForward).unwrap_or_else(|| midnight.and_utc())
}

/// The calendar date of `instant` as seen in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}
