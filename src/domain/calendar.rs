use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("calendar `{0}` has no working days in its week pattern")]
    NoWorkingDays(String),
    #[error("calendar `{0}` has non-positive hours per day")]
    InvalidHoursPerDay(String),
    #[error("calendar `{calendar}` has an exception range starting after it ends ({from} > {to})")]
    InvertedExceptionRange {
        calendar: String,
        from: NaiveDate,
        to: NaiveDate,
    },
}

/// A dated exception that overrides the weekly pattern.
///
/// `working = false` models a holiday, `working = true` an extra working
/// day. Recurring exceptions (`every_year`) are matched by month and day
/// in every year, so a `Dec 24 - Dec 26` range closes those dates annually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarException {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub working: bool,
    pub every_year: bool,
}

impl CalendarException {
    pub fn holiday(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            working: false,
            every_year: false,
        }
    }

    pub fn extra_working_day(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
            working: true,
            every_year: false,
        }
    }

    fn applies_to(&self, date: NaiveDate) -> bool {
        if self.every_year {
            let md = (date.month(), date.day());
            let from = (self.from.month(), self.from.day());
            let to = (self.to.month(), self.to.day());
            if from <= to {
                md >= from && md <= to
            } else {
                // Range wraps the year end, e.g. Dec 28 - Jan 2.
                md >= from || md <= to
            }
        } else {
            date >= self.from && date <= self.to
        }
    }
}

/// Working calendar: weekly pattern, daily hours and dated exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    pub name: String,
    /// Monday through Sunday.
    pub working_days: [bool; 7],
    pub hours_per_day: f64,
    /// Later entries override earlier ones for overlapping dates.
    pub exceptions: Vec<CalendarException>,
}

impl WorkCalendar {
    /// Monday to Friday, eight hours per day and no exceptions.
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            working_days: [true, true, true, true, true, false, false],
            hours_per_day: 8.0,
            exceptions: Vec::new(),
        }
    }

    pub fn with_working_days(mut self, working_days: [bool; 7]) -> Self {
        self.working_days = working_days;
        self
    }

    pub fn with_hours_per_day(mut self, hours_per_day: f64) -> Self {
        self.hours_per_day = hours_per_day;
        self
    }

    pub fn with_exception(mut self, exception: CalendarException) -> Self {
        self.exceptions.push(exception);
        self
    }

    /// A calendar with an empty weekly pattern never terminates date
    /// arithmetic, so it is rejected before any run starts.
    pub fn validate(&self) -> Result<(), CalendarError> {
        if !self.working_days.iter().any(|working| *working) {
            return Err(CalendarError::NoWorkingDays(self.name.clone()));
        }
        if !self.hours_per_day.is_finite() || self.hours_per_day <= 0.0 {
            return Err(CalendarError::InvalidHoursPerDay(self.name.clone()));
        }
        for exception in &self.exceptions {
            if !exception.every_year && exception.from > exception.to {
                return Err(CalendarError::InvertedExceptionRange {
                    calendar: self.name.clone(),
                    from: exception.from,
                    to: exception.to,
                });
            }
        }
        Ok(())
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        // The last matching exception wins.
        for exception in self.exceptions.iter().rev() {
            if exception.applies_to(date) {
                return exception.working;
            }
        }
        self.working_days[date.weekday().num_days_from_monday() as usize]
    }

    /// First working day at or after `date`.
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        while !self.is_working_day(current) {
            current = match current.succ_opt() {
                Some(next) => next,
                None => return current,
            };
        }
        current
    }

    /// The date on which `days` working days of effort, started on the
    /// first working day at or after `date`, are complete. A fractional
    /// remainder finishes inside its working day, so it rounds up into
    /// that day. `days <= 0` returns the normalized start day itself.
    pub fn add_working_days(&self, date: NaiveDate, days: f64) -> NaiveDate {
        let mut current = self.next_working_day(date);
        if days <= 0.0 {
            return current;
        }
        let mut remaining = days.ceil() as i64 - 1;
        while remaining > 0 {
            let next = match current.succ_opt() {
                Some(next) => next,
                None => return current,
            };
            current = self.next_working_day(next);
            remaining -= 1;
        }
        current
    }

    /// Number of working days in the inclusive range `[from, to]`.
    pub fn count_working_days(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        let mut count = 0;
        let mut current = from;
        while current <= to {
            if self.is_working_day(current) {
                count += 1;
            }
            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        count
    }
}

/// The calendar resolver: one primary project calendar plus named extras.
///
/// Activities reference calendars by name; unknown or absent references
/// fall back to the primary. The schedule axis (working-day offsets) runs
/// on the primary calendar; an activity on a calendar with different daily
/// hours has its duration rescaled onto that axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSet {
    primary: WorkCalendar,
    extras: HashMap<String, WorkCalendar>,
}

impl CalendarSet {
    pub fn new(primary: WorkCalendar) -> Self {
        Self {
            primary,
            extras: HashMap::new(),
        }
    }

    /// Five-day week, eight hours, no exceptions.
    pub fn standard() -> Self {
        Self::new(WorkCalendar::standard("standard"))
    }

    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.extras.insert(calendar.name.clone(), calendar);
        self
    }

    pub fn primary(&self) -> &WorkCalendar {
        &self.primary
    }

    pub fn contains(&self, name: &str) -> bool {
        self.primary.name == name || self.extras.contains_key(name)
    }

    pub fn resolve(&self, name: Option<&str>) -> &WorkCalendar {
        match name {
            Some(name) if self.primary.name == name => &self.primary,
            Some(name) => self.extras.get(name).unwrap_or(&self.primary),
            None => &self.primary,
        }
    }

    pub fn validate(&self) -> Result<(), CalendarError> {
        self.primary.validate()?;
        for calendar in self.extras.values() {
            calendar.validate()?;
        }
        Ok(())
    }

    /// Duration in working days of `calendar`, rescaled onto the primary
    /// working-day axis by the ratio of daily hours.
    pub fn scale_duration(&self, calendar: Option<&str>, days: f64) -> f64 {
        let calendar = self.resolve(calendar);
        days * calendar.hours_per_day / self.primary.hours_per_day
    }

    /// Date on which the working-day offset `offset` (measured from
    /// `project_start` on the primary calendar) is reached.
    pub fn finish_date_at(&self, project_start: NaiveDate, offset: f64) -> NaiveDate {
        self.primary.add_working_days(project_start, offset)
    }

    /// Date on which work at working-day offset `offset` begins.
    pub fn start_date_at(&self, project_start: NaiveDate, offset: f64) -> NaiveDate {
        self.primary.add_working_days(project_start, offset.floor() + 1.0)
    }
}
