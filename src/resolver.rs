//! Due-date resolution for recurring routes.
//!
//! Everything here is a pure function of a [`Route`] and a calendar date. No
//! clock is read and nothing is cached, so callers may evaluate any number of
//! routes concurrently.

use crate::calendar::{self, CalendarContext};
use crate::route::{Frequency, Route};
use chrono::{Datelike, Days, Months, NaiveDate};
use tracing::debug;

/// How far past the starting date `next_due_date` will look.
pub const SEARCH_HORIZON_WEEKS: u64 = 104;

/// Whether `route` should be serviced on `date`.
pub fn is_due(route: &Route, date: NaiveDate) -> bool {
    debug_assert!(
        route.validate().is_ok(),
        "route {} reached the resolver without passing validation",
        route.id
    );

    if !route.active || date.weekday() != route.day_of_week {
        return false;
    }
    if date < route.start_on {
        return false;
    }
    if route.stop_after.is_some_and(|stop| date > stop) {
        return false;
    }
    if route
        .skip_week_numbers
        .contains(&calendar::iso_week_number(date))
    {
        return false;
    }
    cadence_matches(route, date)
}

fn cadence_matches(route: &Route, date: NaiveDate) -> bool {
    match route.frequency {
        Frequency::Weekly => true,
        Frequency::Biweekly | Frequency::Custom => {
            let Some(period) = route.frequency.week_period(route.skip_weeks) else {
                return false;
            };
            let weeks = calendar::weeks_between(route.anchor(), date);
            (weeks + i64::from(route.week_offset)).rem_euclid(period) == 0
        }
        Frequency::Monthly => route.monthly_slot().is_some_and(|slot| slot.matches(date)),
    }
}

/// Earliest due date strictly after `from`, or `None` if nothing is due
/// within [`SEARCH_HORIZON_WEEKS`] or before `stop_after`.
pub fn next_due_date(route: &Route, from: NaiveDate) -> Option<NaiveDate> {
    let first = from.succ_opt()?;
    search(route, first, horizon_end(from))
}

/// Like [`next_due_date`] but `from` itself is a candidate.
pub fn next_due_date_inclusive(route: &Route, from: NaiveDate) -> Option<NaiveDate> {
    search(route, from, horizon_end(from))
}

fn horizon_end(from: NaiveDate) -> NaiveDate {
    from.checked_add_days(Days::new(SEARCH_HORIZON_WEEKS * 7))
        .unwrap_or(NaiveDate::MAX)
}

fn search(route: &Route, first: NaiveDate, horizon: NaiveDate) -> Option<NaiveDate> {
    if !route.active {
        return None;
    }
    let last = match route.stop_after {
        Some(stop) => stop.min(horizon),
        None => horizon,
    };
    let start = first.max(route.start_on);
    let found = match route.frequency {
        Frequency::Monthly => search_monthly(route, start, last),
        _ => search_weekly(route, start, last),
    };

    if found.is_none() {
        debug!(
            route_id = route.id,
            from = %first,
            until = %last,
            "no due date within search window"
        );
    }
    found
}

fn search_weekly(route: &Route, start: NaiveDate, last: NaiveDate) -> Option<NaiveDate> {
    let mut candidate = calendar::next_weekday_on_or_after(start, route.day_of_week)?;
    while candidate <= last {
        if is_due(route, candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_add_days(Days::new(7))?;
    }
    None
}

/// Visits only the slot date of each month, starting with the month of `start`.
fn search_monthly(route: &Route, start: NaiveDate, last: NaiveDate) -> Option<NaiveDate> {
    let slot = route.monthly_slot()?;
    let mut month = NaiveDate::from_ymd_opt(start.year(), start.month(), 1)?;
    while month <= last {
        if let Some(candidate) = slot.date_in(month.year(), month.month(), route.day_of_week) {
            if candidate > last {
                break;
            }
            if candidate >= start && is_due(route, candidate) {
                return Some(candidate);
            }
        }
        month = month.checked_add_months(Months::new(1))?;
    }
    None
}

/// Due dates of `route` within `[start, end]`, ascending.
///
/// The iterator is lazy and `Clone`; a clone resumes from the same point.
pub fn occurrences_in_range(route: &Route, start: NaiveDate, end: NaiveDate) -> Occurrences<'_> {
    Occurrences {
        route,
        start,
        end,
        cursor: start.pred_opt(),
        done: false,
    }
}

#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    route: &'a Route,
    start: NaiveDate,
    end: NaiveDate,
    cursor: Option<NaiveDate>,
    done: bool,
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = match self.cursor {
            Some(cursor) => next_due_date(self.route, cursor),
            // start is NaiveDate::MIN
            None => next_due_date_inclusive(self.route, self.start),
        };
        match next {
            Some(date) if date <= self.end => {
                self.cursor = Some(date);
                Some(date)
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

impl std::iter::FusedIterator for Occurrences<'_> {}

pub fn is_due_today(route: &Route, context: &CalendarContext) -> bool {
    is_due(route, context.today())
}

/// Next visit counted from the context's today, including today itself.
pub fn next_due_from_today(route: &Route, context: &CalendarContext) -> Option<NaiveDate> {
    next_due_date_inclusive(route, context.today())
}
