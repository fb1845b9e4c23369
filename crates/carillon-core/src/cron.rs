//! Cron expression parsing and next-occurrence search
//!
//! Expressions carry up to six whitespace-separated fields:
//!
//! ```text
//! second   minute   hour   day-of-month   month   day-of-week
//! 0-59     0-59     0-23   1-31           1-12    0-6 (0 = Sunday)
//! ```
//!
//! Each field accepts `*`, single values, `A-B` ranges, `/step` suffixes
//! and comma lists; month and day-of-week also accept three-letter
//! English names. Missing trailing fields default to `*`. Input with
//! more than six tokens is truncated to the first six before parsing.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use thiserror::Error;
use tracing::debug;

/// Maximum number of fields in an expression.
pub const MAX_FIELDS: usize = 6;

/// How many years past the starting instant the occurrence search runs
/// before giving up, which bounds the work for expressions that can
/// never match (February 30 and friends).
const YEAR_HORIZON: i32 = 5;

/// Cron parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The expression contained no fields at all.
    #[error("cron expression has no fields")]
    Empty,
    /// A field could not be interpreted.
    #[error("{name} field {text:?}: {reason}")]
    Field {
        /// Field name (second, minute, ...).
        name: &'static str,
        /// Offending field text.
        text: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Valid bounds and recognized names for one field.
struct Bounds {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [(&'static str, u32)],
}

const SECOND: Bounds = Bounds { name: "second", min: 0, max: 59, names: &[] };
const MINUTE: Bounds = Bounds { name: "minute", min: 0, max: 59, names: &[] };
const HOUR: Bounds = Bounds { name: "hour", min: 0, max: 23, names: &[] };
const DAY_OF_MONTH: Bounds = Bounds { name: "day-of-month", min: 1, max: 31, names: &[] };
const MONTH: Bounds = Bounds {
    name: "month",
    min: 1,
    max: 12,
    names: &[
        ("jan", 1),
        ("feb", 2),
        ("mar", 3),
        ("apr", 4),
        ("may", 5),
        ("jun", 6),
        ("jul", 7),
        ("aug", 8),
        ("sep", 9),
        ("oct", 10),
        ("nov", 11),
        ("dec", 12),
    ],
};
const DAY_OF_WEEK: Bounds = Bounds {
    name: "day-of-week",
    min: 0,
    max: 6,
    names: &[
        ("sun", 0),
        ("mon", 1),
        ("tue", 2),
        ("wed", 3),
        ("thu", 4),
        ("fri", 5),
        ("sat", 6),
    ],
};

/// Set of permitted values for one field, as a bitmask over the value
/// itself. `any` records whether the field was written starting with
/// `*`, which matters for the day-of-month/day-of-week interplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet {
    bits: u64,
    any: bool,
}

impl FieldSet {
    fn contains(self, value: u32) -> bool {
        self.bits >> value & 1 == 1
    }
}

/// Collapse internal whitespace and keep at most [`MAX_FIELDS`] tokens.
///
/// This is the canonical textual form used as the deduplication and
/// diff key by schedule reconciliation.
#[must_use]
pub fn canonicalize(line: &str) -> String {
    line.split_whitespace()
        .take(MAX_FIELDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A parsed, immutable cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    canonical: String,
    second: FieldSet,
    minute: FieldSet,
    hour: FieldSet,
    day_of_month: FieldSet,
    month: FieldSet,
    day_of_week: FieldSet,
}

impl CronExpr {
    /// Parse an expression from text.
    ///
    /// The text is whitespace-normalized first; tokens past the sixth
    /// are dropped rather than rejected. Missing trailing fields
    /// default to `*`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        if tokens.len() > MAX_FIELDS {
            debug!("expression has more than {MAX_FIELDS} fields, retaining only the first {MAX_FIELDS}");
        }
        let tokens = &tokens[..tokens.len().min(MAX_FIELDS)];
        let canonical = tokens.join(" ");
        let field = |index: usize| tokens.get(index).copied().unwrap_or("*");

        Ok(Self {
            second: parse_field(field(0), &SECOND)?,
            minute: parse_field(field(1), &MINUTE)?,
            hour: parse_field(field(2), &HOUR)?,
            day_of_month: parse_field(field(3), &DAY_OF_MONTH)?,
            month: parse_field(field(4), &MONTH)?,
            day_of_week: parse_field(field(5), &DAY_OF_WEEK)?,
            canonical,
        })
    }

    /// Build an expression that fires every `secs` seconds.
    ///
    /// Returns `None` when the interval cannot be written as a cron
    /// step: anything below a minute works (the step restarts at the
    /// top of each minute), above that the interval must be a whole
    /// number of minutes below an hour, or of hours below a day.
    #[must_use]
    pub fn every(secs: u32) -> Option<Self> {
        let text = if secs == 0 {
            return None;
        } else if secs < 60 {
            format!("*/{secs} * * * * *")
        } else if secs % 3600 == 0 && secs / 3600 <= 23 {
            format!("0 0 */{} * * *", secs / 3600)
        } else if secs % 60 == 0 && secs / 60 <= 59 {
            format!("0 */{} * * * *", secs / 60)
        } else {
            return None;
        };
        // The generated text is always well-formed.
        Self::parse(&text).ok()
    }

    /// The whitespace-normalized textual form.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Earliest instant strictly after `from` matching every field, or
    /// `None` when no occurrence exists within the search horizon.
    ///
    /// Pure function of `(self, from)`: the search walks candidate
    /// instants field by field, carrying into the next coarser unit
    /// whenever a field wraps (seconds through years).
    #[must_use]
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // Start at the next whole second; sub-second precision is not
        // part of the contract.
        let mut t = from.with_nanosecond(0)? + Duration::seconds(1);
        let year_limit = t.year() + YEAR_HORIZON;

        // Once any field is bumped, all finer fields have been reset to
        // their minimum and need no further truncation.
        let mut bumped = false;

        'search: loop {
            if t.year() > year_limit {
                return None;
            }

            while !self.month.contains(t.month()) {
                if !bumped {
                    bumped = true;
                    t = start_of_month(t)?;
                }
                t = next_month(t)?;
                if t.month() == 1 {
                    continue 'search;
                }
            }

            while !self.day_matches(t) {
                if !bumped {
                    bumped = true;
                    t = start_of_day(t)?;
                }
                t += Duration::days(1);
                if t.day() == 1 {
                    continue 'search;
                }
            }

            while !self.hour.contains(t.hour()) {
                if !bumped {
                    bumped = true;
                    t = t.with_minute(0)?.with_second(0)?;
                }
                t += Duration::hours(1);
                if t.hour() == 0 {
                    continue 'search;
                }
            }

            while !self.minute.contains(t.minute()) {
                if !bumped {
                    bumped = true;
                    t = t.with_second(0)?;
                }
                t += Duration::minutes(1);
                if t.minute() == 0 {
                    continue 'search;
                }
            }

            while !self.second.contains(t.second()) {
                bumped = true;
                t += Duration::seconds(1);
                if t.second() == 0 {
                    continue 'search;
                }
            }

            return Some(t);
        }
    }

    /// Day matching: when both day fields are restricted, either one
    /// suffices; when one is `*`, the other alone decides.
    fn day_matches(&self, t: DateTime<Utc>) -> bool {
        let dom = self.day_of_month.contains(t.day());
        let dow = self
            .day_of_week
            .contains(t.weekday().num_days_from_sunday());
        if self.day_of_month.any || self.day_of_week.any {
            dom && dow
        } else {
            dom || dow
        }
    }
}

fn start_of_month(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(t.year(), t.month(), 1, 0, 0, 0).single()
}

fn next_month(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

fn start_of_day(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    t.with_hour(0)?.with_minute(0)?.with_second(0)
}

fn parse_field(text: &str, bounds: &Bounds) -> Result<FieldSet, ParseError> {
    let mut set = FieldSet { bits: 0, any: false };
    for part in text.split(',') {
        let (bits, any) = parse_part(part, bounds).map_err(|reason| ParseError::Field {
            name: bounds.name,
            text: text.to_string(),
            reason,
        })?;
        set.bits |= bits;
        set.any |= any;
    }
    Ok(set)
}

/// Parse one comma-separated part: `*`, `N`, `A-B`, optionally with a
/// `/step` suffix. A step on a single value extends the range to the
/// field maximum, as in `0/5` meaning every fifth value from zero.
fn parse_part(part: &str, bounds: &Bounds) -> Result<(u64, bool), String> {
    let (range, step) = match part.split_once('/') {
        Some((range, step)) => {
            let step: u32 = step
                .parse()
                .map_err(|_| format!("invalid step {step:?}"))?;
            if step == 0 {
                return Err("step must be at least 1".to_string());
            }
            (range, Some(step))
        }
        None => (part, None),
    };

    let any = range == "*";
    let (low, high) = if any {
        (bounds.min, bounds.max)
    } else {
        match range.split_once('-') {
            Some((low, high)) => (
                parse_value(low, bounds)?,
                parse_value(high, bounds)?,
            ),
            None => {
                let low = parse_value(range, bounds)?;
                // A bare value with a step runs to the field maximum.
                let high = if step.is_some() { bounds.max } else { low };
                (low, high)
            }
        }
    };

    if low > high {
        return Err(format!("range {low}-{high} is inverted"));
    }
    if low < bounds.min || high > bounds.max {
        return Err(format!(
            "value out of range {}-{}",
            bounds.min, bounds.max
        ));
    }

    let step = step.unwrap_or(1);
    let mut bits = 0u64;
    let mut value = low;
    while value <= high {
        bits |= 1 << value;
        value += step;
    }
    Ok((bits, any))
}

fn parse_value(text: &str, bounds: &Bounds) -> Result<u32, String> {
    for (name, value) in bounds.names {
        if text.eq_ignore_ascii_case(name) {
            return Ok(*value);
        }
    }
    text.parse()
        .map_err(|_| format!("invalid value {text:?}"))
}

#[cfg(test)]
mod tests;
