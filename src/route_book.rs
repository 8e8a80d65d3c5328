use crate::calendar;
use crate::resolver;
use crate::route::{Route, weekday_name};
use crate::route_validation::{self, RouteConfigError};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days between 0001-01-01 and 1970-01-01, the epoch polars dates count from.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One pool visit a technician owes on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub route_id: i32,
    pub technician_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<i32>,
    pub route_name: String,
    pub date: NaiveDate,
}

/// A single scheduled visit in a calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub route_id: i32,
    pub date: NaiveDate,
}

/// Validated routes keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteBook {
    routes: BTreeMap<i32, Route>,
}

impl RouteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes(routes: Vec<Route>) -> Result<Self, RouteConfigError> {
        route_validation::validate_route_collection(&routes)?;
        Ok(Self {
            routes: routes.into_iter().map(|route| (route.id, route)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn to_vec(&self) -> Vec<Route> {
        self.routes.values().cloned().collect()
    }

    pub fn find(&self, route_id: i32) -> Option<&Route> {
        self.routes.get(&route_id)
    }

    pub fn next_id(&self) -> i32 {
        self.routes.keys().next_back().map(|id| id + 1).unwrap_or(1)
    }

    /// Add a new route; fails if the id is taken.
    pub fn insert(&mut self, route: Route) -> Result<(), RouteConfigError> {
        if self.routes.contains_key(&route.id) {
            return Err(RouteConfigError::DuplicateRouteId(route.id));
        }
        route.validate()?;
        self.routes.insert(route.id, route);
        Ok(())
    }

    /// Insert or replace, returning the previous version if any.
    pub fn upsert(&mut self, route: Route) -> Result<Option<Route>, RouteConfigError> {
        route.validate()?;
        Ok(self.routes.insert(route.id, route))
    }

    /// Apply `edit` to a stored route, keeping the old version if the result
    /// no longer validates.
    pub fn update<F>(&mut self, route_id: i32, edit: F) -> Result<bool, RouteConfigError>
    where
        F: FnOnce(&mut Route),
    {
        let Some(existing) = self.routes.get(&route_id) else {
            return Ok(false);
        };
        let mut edited = existing.clone();
        edit(&mut edited);
        edited.id = route_id;
        edited.validate()?;
        self.routes.insert(route_id, edited);
        Ok(true)
    }

    pub fn delete(&mut self, route_id: i32) -> Option<Route> {
        self.routes.remove(&route_id)
    }

    /// Every route due on `date`, ascending by id.
    pub fn due_on(&self, date: NaiveDate) -> Vec<&Route> {
        let mut due: Vec<&Route> = self
            .routes
            .par_iter()
            .filter(|(_, route)| resolver::is_due(route, date))
            .map(|(_, route)| route)
            .collect();
        due.sort_by_key(|route| route.id);
        due
    }

    /// Routes a technician must work on `date`.
    pub fn assignments_for(&self, technician_id: i32, date: NaiveDate) -> Vec<Assignment> {
        self.due_on(date)
            .into_iter()
            .filter(|route| route.technician_id == Some(technician_id))
            .map(|route| Assignment {
                route_id: route.id,
                technician_id,
                pool_id: route.pool_id,
                route_name: route.name.clone(),
                date,
            })
            .collect()
    }

    /// All visits across the book in `[start, end]`, ordered by date then
    /// route id.
    pub fn calendar(&self, start: NaiveDate, end: NaiveDate) -> Vec<Occurrence> {
        let mut occurrences: Vec<Occurrence> = self
            .routes
            .par_iter()
            .flat_map_iter(|(&route_id, route)| {
                resolver::occurrences_in_range(route, start, end)
                    .map(move |date| Occurrence { route_id, date })
            })
            .collect();
        occurrences.sort_by_key(|occ| (occ.date, occ.route_id));
        occurrences
    }

    pub fn routes_frame(&self) -> PolarsResult<DataFrame> {
        let routes: Vec<&Route> = self.routes.values().collect();

        let ids: Vec<i32> = routes.iter().map(|r| r.id).collect();
        let names: Vec<&str> = routes.iter().map(|r| r.name.as_str()).collect();
        let technicians: Vec<Option<i32>> = routes.iter().map(|r| r.technician_id).collect();
        let pools: Vec<Option<i32>> = routes.iter().map(|r| r.pool_id).collect();
        let days: Vec<&str> = routes.iter().map(|r| weekday_name(r.day_of_week)).collect();
        let frequencies: Vec<&str> = routes.iter().map(|r| r.frequency.as_str()).collect();
        let skip_weeks: Vec<u32> = routes.iter().map(|r| r.skip_weeks).collect();
        let offsets: Vec<u32> = routes.iter().map(|r| r.week_offset).collect();
        let skipped: Vec<String> = routes
            .iter()
            .map(|r| {
                r.skip_week_numbers
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
        let active: Vec<bool> = routes.iter().map(|r| r.active).collect();

        let columns = vec![
            Series::new(PlSmallStr::from_static("id"), ids).into_column(),
            Series::new(PlSmallStr::from_static("name"), names).into_column(),
            Series::new(PlSmallStr::from_static("technician_id"), technicians).into_column(),
            Series::new(PlSmallStr::from_static("pool_id"), pools).into_column(),
            Series::new(PlSmallStr::from_static("day_of_week"), days).into_column(),
            Series::new(PlSmallStr::from_static("frequency"), frequencies).into_column(),
            date_series("start_on", routes.iter().map(|r| Some(r.start_on)))?.into_column(),
            date_series("stop_after", routes.iter().map(|r| r.stop_after))?.into_column(),
            date_series("anchor_date", routes.iter().map(|r| r.anchor_date))?.into_column(),
            Series::new(PlSmallStr::from_static("skip_weeks"), skip_weeks).into_column(),
            Series::new(PlSmallStr::from_static("week_offset"), offsets).into_column(),
            Series::new(PlSmallStr::from_static("skip_week_numbers"), skipped).into_column(),
            Series::new(PlSmallStr::from_static("active"), active).into_column(),
        ];
        DataFrame::new(columns)
    }

    pub fn calendar_frame(&self, start: NaiveDate, end: NaiveDate) -> PolarsResult<DataFrame> {
        let occurrences = self.calendar(start, end);

        let route_ids: Vec<i32> = occurrences.iter().map(|occ| occ.route_id).collect();
        let weeks: Vec<u32> = occurrences
            .iter()
            .map(|occ| calendar::iso_week_number(occ.date))
            .collect();
        let technicians: Vec<Option<i32>> = occurrences
            .iter()
            .map(|occ| self.find(occ.route_id).and_then(|r| r.technician_id))
            .collect();
        let pools: Vec<Option<i32>> = occurrences
            .iter()
            .map(|occ| self.find(occ.route_id).and_then(|r| r.pool_id))
            .collect();

        DataFrame::new(vec![
            Series::new(PlSmallStr::from_static("route_id"), route_ids).into_column(),
            date_series("date", occurrences.iter().map(|occ| Some(occ.date)))?.into_column(),
            Series::new(PlSmallStr::from_static("iso_week"), weeks).into_column(),
            Series::new(PlSmallStr::from_static("technician_id"), technicians).into_column(),
            Series::new(PlSmallStr::from_static("pool_id"), pools).into_column(),
        ])
    }
}

fn date_series<I>(name: &'static str, dates: I) -> PolarsResult<Series>
where
    I: IntoIterator<Item = Option<NaiveDate>>,
{
    let days: Vec<Option<i32>> = dates
        .into_iter()
        .map(|date| date.map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
        .collect();
    Series::new(PlSmallStr::from_static(name), days).cast(&DataType::Date)
}
