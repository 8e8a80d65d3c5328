use crate::route::{Route, RouteRecord};
use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

pub const MIN_ISO_WEEK: u32 = 1;
pub const MAX_ISO_WEEK: u32 = 53;

/// A route whose fields break the scheduling invariants.
///
/// Raised where routes enter the system (deserialization, store loads, book
/// inserts). Once a route has passed validation the resolver never fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteConfigError {
    #[error("invalid route configuration: route {route_id} has negative skipWeeks {value}")]
    NegativeSkipWeeks { route_id: i32, value: i64 },
    #[error("invalid route configuration: route {route_id} has negative weekOffset {value}")]
    NegativeWeekOffset { route_id: i32, value: i64 },
    #[error("invalid route configuration: route {route_id} {field} {value} is too large")]
    ValueOutOfRange {
        route_id: i32,
        field: &'static str,
        value: i64,
    },
    #[error(
        "invalid route configuration: route {route_id} stopAfter {stop_after} precedes startOn {start_on}"
    )]
    StopBeforeStart {
        route_id: i32,
        start_on: NaiveDate,
        stop_after: NaiveDate,
    },
    #[error("invalid route configuration: route {route_id} has unknown frequency '{value}'")]
    UnknownFrequency { route_id: i32, value: String },
    #[error("invalid route configuration: route {route_id} has unknown dayOfWeek '{value}'")]
    UnknownDayOfWeek { route_id: i32, value: String },
    #[error(
        "invalid route configuration: route {route_id} skipWeekNumbers entry {week} is outside 1-53"
    )]
    SkipWeekNumberOutOfRange { route_id: i32, week: i64 },
    #[error("invalid route configuration: duplicate route id {0}")]
    DuplicateRouteId(i32),
}

/// Checks the signed wire fields before they are narrowed into a [`Route`].
pub(crate) fn validate_record(record: &RouteRecord) -> Result<(), RouteConfigError> {
    let route_id = record.id;
    if record.skip_weeks < 0 {
        return Err(RouteConfigError::NegativeSkipWeeks {
            route_id,
            value: record.skip_weeks,
        });
    }
    if record.week_offset < 0 {
        return Err(RouteConfigError::NegativeWeekOffset {
            route_id,
            value: record.week_offset,
        });
    }
    if let Some(stop_after) = record.stop_after {
        if stop_after < record.start_on {
            return Err(RouteConfigError::StopBeforeStart {
                route_id,
                start_on: record.start_on,
                stop_after,
            });
        }
    }
    for &week in &record.skip_week_numbers {
        if week < i64::from(MIN_ISO_WEEK) || week > i64::from(MAX_ISO_WEEK) {
            return Err(RouteConfigError::SkipWeekNumberOutOfRange { route_id, week });
        }
    }
    Ok(())
}

pub fn validate_route(route: &Route) -> Result<(), RouteConfigError> {
    if let Some(stop_after) = route.stop_after {
        if stop_after < route.start_on {
            return Err(RouteConfigError::StopBeforeStart {
                route_id: route.id,
                start_on: route.start_on,
                stop_after,
            });
        }
    }
    if let Some(&week) = route
        .skip_week_numbers
        .iter()
        .find(|week| !(MIN_ISO_WEEK..=MAX_ISO_WEEK).contains(*week))
    {
        return Err(RouteConfigError::SkipWeekNumberOutOfRange {
            route_id: route.id,
            week: i64::from(week),
        });
    }
    Ok(())
}

pub fn validate_route_collection(routes: &[Route]) -> Result<(), RouteConfigError> {
    let mut seen_ids = HashSet::with_capacity(routes.len());
    for route in routes {
        if !seen_ids.insert(route.id) {
            return Err(RouteConfigError::DuplicateRouteId(route.id));
        }
        validate_route(route)?;
    }
    Ok(())
}
