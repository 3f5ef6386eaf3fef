//! Simulation clock: day, working-day and month enumeration over the
//! horizon. No component reads the host clock; every date flows from here.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Inclusive simulation horizon `[Jan 1 of start year, Dec 31 of end year]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calendar {
    start: NaiveDate,
    end: NaiveDate,
}

impl Calendar {
    /// Build a calendar for the given inclusive year range.
    pub fn new(start_year: i32, end_year: i32) -> Option<Calendar> {
        if end_year < start_year {
            return None;
        }
        Some(Calendar {
            start: NaiveDate::from_ymd_opt(start_year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(end_year, 12, 31)?,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start.year()..=self.end.year()
    }

    /// All days in the horizon in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Weekdays (Mon-Fri) in the horizon in order.
    pub fn working_days(&self) -> impl Iterator<Item = NaiveDate> {
        self.days().filter(|d| is_working_day(*d))
    }

    /// `(year, month)` pairs covering the horizon.
    pub fn months(&self) -> Vec<(i32, u32)> {
        self.years()
            .flat_map(|y| (1..=12).map(move |m| (y, m)))
            .collect()
    }

    /// Working days of one month, bounded by the horizon.
    pub fn working_days_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };
        first
            .iter_days()
            .take_while(|d| d.month() == month && *d <= self.end)
            .filter(|d| is_working_day(*d))
            .collect()
    }

    /// Clamp a date into the horizon.
    pub fn clamp(&self, d: NaiveDate) -> NaiveDate {
        d.max(self.start).min(self.end)
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }
}

/// Weekday test: Monday..Friday.
pub fn is_working_day(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Last day of the given month.
pub fn month_end(year: i32, month: u32) -> NaiveDate {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Advance `n` working days from `d` (exclusive of `d` itself).
pub fn add_working_days(d: NaiveDate, n: u32) -> NaiveDate {
    let mut current = d;
    let mut added = 0;
    while added < n {
        current = current.checked_add_days(Days::new(1)).unwrap_or(current);
        if is_working_day(current) {
            added += 1;
        }
    }
    current
}

/// Count working days in the inclusive window `[from, to]`.
pub fn working_days_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to < from {
        return 0;
    }
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| is_working_day(*d))
        .count() as u32
}
