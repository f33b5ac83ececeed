//! # Business Clock
//!
//! Day, month and year boundaries in the pharmacy's business timezone.
//!
//! ## Why a Business Timezone?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Server runs in UTC, pharmacy is at UTC+05:00                          │
//! │                                                                         │
//! │  Sale at 2025-10-01 21:30 UTC                                          │
//! │     server-local day:   2025-10-01   ❌ (wrong invoice counter)        │
//! │     business day:       2025-10-02   ✅ → invoice 20251002-0001        │
//! │                                                                         │
//! │  Invoice numbering and every date-range report use the same clock,     │
//! │  so "today's sales" always matches "today's invoice numbers".          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The clock never reads the system time itself: callers pass `now`.
//! Only fixed offsets are supported (no DST rules).

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Business Clock
// =============================================================================

/// Converts between UTC instants and business-local calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessClock {
    offset: FixedOffset,
}

impl Default for BusinessClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl BusinessClock {
    pub const fn new(offset: FixedOffset) -> Self {
        BusinessClock { offset }
    }

    pub fn utc() -> Self {
        BusinessClock {
            offset: Utc.fix(),
        }
    }

    /// Builds a clock from an offset string such as `+05:00`, `-03:30` or `Z`.
    ///
    /// ```rust
    /// use rxdesk_core::clock::BusinessClock;
    ///
    /// let clock = BusinessClock::from_offset_str("+05:00").unwrap();
    /// assert_eq!(clock.offset().local_minus_utc(), 5 * 3600);
    /// assert!(BusinessClock::from_offset_str("+25:00").is_err());
    /// ```
    pub fn from_offset_str(value: &str) -> Result<Self, ValidationError> {
        parse_utc_offset(value).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Business-local calendar date of an instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Alias of [`local_date`](Self::local_date) for "what day is it".
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_date(now)
    }

    /// `YYYYMMDD` of the business day containing `now`.
    pub fn day_key(&self, now: DateTime<Utc>) -> String {
        self.local_date(now).format("%Y%m%d").to_string()
    }

    /// UTC instant at which the business-local midnight of `date` falls.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight: NaiveDateTime = date.and_time(NaiveTime::MIN);
        let utc = local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }

    /// Half-open UTC window covering the inclusive business dates `from..=to`.
    pub fn date_range_window(&self, from: NaiveDate, to: NaiveDate) -> TimeWindow {
        let end_date = to.succ_opt().unwrap_or(NaiveDate::MAX);
        TimeWindow {
            start: self.start_of_day(from),
            end: self.start_of_day(end_date),
        }
    }

    /// Window of a single business day.
    pub fn day_window(&self, date: NaiveDate) -> TimeWindow {
        self.date_range_window(date, date)
    }

    /// Window of a `YYYY-MM` period.
    pub fn month_window(&self, period: Period) -> TimeWindow {
        TimeWindow {
            start: self.start_of_day(period.first_day()),
            end: self.start_of_day(period.next().first_day()),
        }
    }

    /// Window of a calendar year.
    pub fn year_window(&self, year: i32) -> TimeWindow {
        let first = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
        let next = NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap_or(NaiveDate::MAX);
        TimeWindow {
            start: self.start_of_day(first),
            end: self.start_of_day(next),
        }
    }
}

/// Parses `+HH:MM`, `-HH:MM`, `+HHMM`, `+HH` or `Z`.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ValidationError> {
    let bad = || {
        ValidationError::invalid_format("utc offset", format!("'{}' is not like +05:00", value))
    };
    let value = value.trim();

    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(bad()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let (hours, minutes) = match digits.len() {
        2 => (&digits[..2], "00"),
        4 => (&digits[..2], &digits[2..]),
        _ => return Err(bad()),
    };
    let hours: i32 = hours.parse().map_err(|_| bad())?;
    let minutes: i32 = minutes.parse().map_err(|_| bad())?;
    if hours > 23 || minutes > 59 {
        return Err(bad());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}

// =============================================================================
// Time Window
// =============================================================================

/// Half-open `[start, end)` interval of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

// =============================================================================
// Period (YYYY-MM)
// =============================================================================

/// A payroll / expense month, written `YYYY-MM`.
///
/// ```rust
/// use rxdesk_core::clock::Period;
///
/// let p: Period = "2025-12".parse().unwrap();
/// assert_eq!(p.next().to_string(), "2026-01");
/// assert!("2025-13".parse::<Period>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    first: NaiveDate,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1900..=9998).contains(&year) {
            return Err(ValidationError::OutOfRange {
                field: "period".to_string(),
                min: 1900,
                max: 9998,
            });
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| Period { first })
            .ok_or_else(|| ValidationError::invalid_format("period", "month must be 01-12"))
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Period {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// Last calendar day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.next().first.pred_opt().unwrap_or(self.first)
    }

    pub fn next(&self) -> Period {
        let (year, month) = if self.month() == 12 {
            (self.year() + 1, 1)
        } else {
            (self.year(), self.month() + 1)
        };
        Period {
            first: NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || ValidationError::invalid_format("period", "expected YYYY-MM");

        if s.is_empty() {
            return Err(ValidationError::required("period"));
        }
        let (year, month) = s.split_once('-').ok_or_else(bad)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(bad());
        }
        if !year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let year: i32 = year.parse().map_err(|_| bad())?;
        let month: u32 = month.parse().map_err(|_| bad())?;

        Period::new(year, month)
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

// =============================================================================
// Unit Tests
// =============================================================================
