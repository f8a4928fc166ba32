//! Calendar-month leave periods and the month arithmetic used by the accrual walk.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid month {month} in year {year}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("unrecognised date '{0}'")]
    InvalidDate(String),
    #[error("period range '{0}' does not hold two dates")]
    InvalidRange(String),
    #[error("moving {months} months from {date} leaves the calendar")]
    Overflow { date: NaiveDate, months: i32 },
}

// Day-first before month-first: the payroll exports are produced with a
// day/month/year locale.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y%m%d",
];

const RANGE_SEPARATORS: &[&str] = &[" - ", " to ", " – "];

/// An inclusive date range. For monthly ledgers it spans the first to the last
/// calendar day of one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Builds a range from two endpoints given in either order.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn month(year: i32, month: u32) -> Result<Self, PeriodError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or(PeriodError::InvalidMonth { year, month })?;
        let end = last_day_of_month(start).ok_or(PeriodError::InvalidMonth { year, month })?;
        Ok(Self { start, end })
    }

    pub fn containing(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let end = last_day_of_month(start).unwrap_or(date);
        Self { start, end }
    }

    /// The calendar month following the one this period starts in.
    pub fn next_month(&self) -> Result<Self, PeriodError> {
        let start = self.start.with_day(1).unwrap_or(self.start);
        let next = add_months(start, 1)?;
        Ok(Self::containing(next))
    }

    /// Every calendar month from the month of `first` to the month of `last`, inclusive.
    pub fn months_between(first: NaiveDate, last: NaiveDate) -> Result<Vec<Self>, PeriodError> {
        let mut periods = Vec::new();
        let mut current = Self::containing(first);
        let stop = Self::containing(last);
        while current.start <= stop.start {
            periods.push(current);
            current = current.next_month()?;
        }
        Ok(periods)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// `YYYYMM` of the period end, used as the summary column suffix.
    pub fn label(&self) -> String {
        self.end.format("%Y%m").to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

pub fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?.checked_add_months(Months::new(1))?.pred_opt()
}

/// Moves `date` by whole calendar months. A day-of-month that does not exist in
/// the target month is clipped to its last day.
pub fn add_months(date: NaiveDate, months: i32) -> Result<NaiveDate, PeriodError> {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.ok_or(PeriodError::Overflow { date, months })
}

/// Whole calendar months elapsed from `start` to `end`. A month counts once
/// `start` moved by that many months, clipped to the end of a shorter month,
/// has been reached: 2014-12-31 to 2015-02-28 is two months. Negative when
/// `end` precedes `start`.
pub fn whole_months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    let landed = add_months(start, months).unwrap_or(end);
    if end >= start && landed > end {
        months - 1
    } else if end < start && landed < end {
        months + 1
    } else {
        months
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, PeriodError> {
    let value = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| PeriodError::InvalidDate(value.to_string()))
}

/// Parses a report range such as `"2015-12-31 - 2015-01-01"`.
///
/// Exports disagree on whether the start or the end comes first, so the
/// earlier date is always taken as the start.
pub fn parse_period_range(raw: &str) -> Result<Period, PeriodError> {
    let value = raw.trim();
    for sep in RANGE_SEPARATORS {
        let parts: Vec<&str> = value.split(sep).collect();
        if let [a, b] = parts.as_slice() {
            return Ok(Period::new(parse_date(a)?, parse_date(b)?));
        }
    }
    Err(PeriodError::InvalidRange(value.to_string()))
}
