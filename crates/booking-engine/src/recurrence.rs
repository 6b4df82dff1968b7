//! Recurrence rules -- how a parent event repeats.
//!
//! A rule is a frequency plus a positive step. Rules are parsed from the pattern
//! strings stored on events: bare keywords (`"weekly"`), phrases
//! (`"every 2 weeks"`), or RFC 5545 RRULE text (`"FREQ=MONTHLY;INTERVAL=3"`).
//! RRULE text goes through the `rrule` crate; only `FREQ` and `INTERVAL` are
//! honoured, because the bounds of a series come from `repeat_until` and the
//! rendering window rather than from the rule itself.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use rrule::{RRule, Unvalidated};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// How often a series repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" | "annually" => Some(Self::Yearly),
            _ => None,
        }
    }

    fn from_unit(word: &str) -> Option<Self> {
        match word {
            "day" | "days" => Some(Self::Daily),
            "week" | "weeks" => Some(Self::Weekly),
            "month" | "months" => Some(Self::Monthly),
            "year" | "years" => Some(Self::Yearly),
            _ => None,
        }
    }

    fn as_rrule(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

/// A validated recurrence rule. `interval` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecurrenceRule {
    frequency: Frequency,
    interval: u32,
}

impl RecurrenceRule {
    /// Build a rule, rejecting a zero step.
    ///
    /// # Errors
    /// Returns `BookingError::RecurrenceParse` when `interval` is 0.
    pub fn new(frequency: Frequency, interval: u32) -> Result<Self> {
        if interval == 0 {
            return Err(BookingError::RecurrenceParse(
                "interval must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            frequency,
            interval,
        })
    }

    /// Parse a stored recurrence pattern.
    ///
    /// # Errors
    /// Returns `BookingError::RecurrenceParse` for empty, unknown, or
    /// unsupported patterns, and for non-positive intervals.
    pub fn parse(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(BookingError::RecurrenceParse(
                "empty recurrence pattern".to_string(),
            ));
        }

        let upper = trimmed.to_uppercase();
        if upper.starts_with("RRULE:") || upper.contains("FREQ=") {
            return Self::parse_rrule(trimmed);
        }
        Self::parse_phrase(&trimmed.to_lowercase())
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// The date `steps` recurrence steps after `anchor`.
    ///
    /// Always computed from the anchor, so month arithmetic clamps against the
    /// anchor's day-of-month each time: Jan 31 gives Feb 28 (or 29), then Mar 31.
    /// Returns `None` on calendar overflow.
    pub fn advance(&self, anchor: NaiveDate, steps: u32) -> Option<NaiveDate> {
        let n = steps.checked_mul(self.interval)?;
        match self.frequency {
            Frequency::Daily => anchor.checked_add_days(Days::new(u64::from(n))),
            Frequency::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(n))),
            Frequency::Monthly => anchor.checked_add_months(Months::new(n)),
            Frequency::Yearly => anchor.checked_add_months(Months::new(n.checked_mul(12)?)),
        }
    }

    /// The number of whole steps from `anchor` that land on or before `target`
    /// (0 when `target` is not after `anchor`).
    ///
    /// Lets expansion start near a window instead of walking every step since
    /// the anchor.
    pub fn steps_until(&self, anchor: NaiveDate, target: NaiveDate) -> u32 {
        if target <= anchor {
            return 0;
        }
        let interval = i64::from(self.interval);
        let whole = match self.frequency {
            Frequency::Daily => (target - anchor).num_days() / interval,
            Frequency::Weekly => (target - anchor).num_days() / (7 * interval),
            Frequency::Monthly | Frequency::Yearly => {
                let months = i64::from(target.year() - anchor.year()) * 12
                    + i64::from(target.month())
                    - i64::from(anchor.month());
                let per_step = match self.frequency {
                    Frequency::Yearly => 12 * interval,
                    _ => interval,
                };
                months / per_step
            }
        };
        let mut steps = u32::try_from(whole).unwrap_or(u32::MAX);
        // Counting months ignores the day: Jan 31 + 2 months lands after Mar 15.
        while steps > 0 && self.advance(anchor, steps).map_or(true, |d| d > target) {
            steps -= 1;
        }
        steps
    }

    fn parse_phrase(pattern: &str) -> Result<Self> {
        if let Some(frequency) = Frequency::from_keyword(pattern) {
            return Self::new(frequency, 1);
        }
        if pattern == "biweekly" {
            return Self::new(Frequency::Weekly, 2);
        }

        // "every week", "every 3 months"
        let mut words = pattern.split_whitespace();
        if words.next() != Some("every") {
            return Err(unknown_pattern(pattern));
        }
        let (step, unit) = match (words.next(), words.next(), words.next()) {
            (Some(unit), None, None) => (1, unit),
            (Some(step), Some(unit), None) => {
                let step: i64 = step.parse().map_err(|_| unknown_pattern(pattern))?;
                (step, unit)
            }
            _ => return Err(unknown_pattern(pattern)),
        };
        if step <= 0 {
            return Err(BookingError::RecurrenceParse(format!(
                "interval must be a positive integer, got {}",
                step
            )));
        }
        let frequency = Frequency::from_unit(unit).ok_or_else(|| unknown_pattern(pattern))?;
        let interval = u32::try_from(step).map_err(|_| {
            BookingError::RecurrenceParse(format!("interval {} is too large", step))
        })?;
        Self::new(frequency, interval)
    }

    fn parse_rrule(pattern: &str) -> Result<Self> {
        let body = match pattern.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &pattern[6..],
            _ => pattern,
        };

        for part in body.split(';') {
            let key = part.split('=').next().unwrap_or("").trim().to_uppercase();
            if key.starts_with("BY") || key == "COUNT" || key == "UNTIL" {
                return Err(BookingError::RecurrenceParse(format!(
                    "unsupported RRULE part '{}'",
                    part.trim()
                )));
            }
            if key == "INTERVAL" {
                let value = part.split('=').nth(1).unwrap_or("").trim();
                if value.parse::<i64>().map_or(true, |n| n <= 0) {
                    return Err(BookingError::RecurrenceParse(format!(
                        "interval must be a positive integer, got '{}'",
                        value
                    )));
                }
            }
        }

        let rule: RRule<Unvalidated> = body
            .to_uppercase()
            .parse()
            .map_err(|e| BookingError::RecurrenceParse(format!("{}", e)))?;

        let frequency = match rule.get_freq() {
            rrule::Frequency::Daily => Frequency::Daily,
            rrule::Frequency::Weekly => Frequency::Weekly,
            rrule::Frequency::Monthly => Frequency::Monthly,
            rrule::Frequency::Yearly => Frequency::Yearly,
            other => {
                return Err(BookingError::RecurrenceParse(format!(
                    "sub-daily frequency {:?} is not supported",
                    other
                )))
            }
        };
        Self::new(frequency, u32::from(rule.get_interval()))
    }
}

impl FromStr for RecurrenceRule {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FREQ={};INTERVAL={}",
            self.frequency.as_rrule(),
            self.interval
        )
    }
}

fn unknown_pattern(pattern: &str) -> BookingError {
    BookingError::RecurrenceParse(format!("unknown recurrence pattern '{}'", pattern))
}
