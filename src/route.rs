use crate::calendar::{self, ALL_WEEKDAYS};
use crate::route_validation::{self, RouteConfigError};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How often a route comes around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "WEEKLY",
            Frequency::Biweekly => "BIWEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Custom => "CUSTOM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WEEKLY" => Some(Frequency::Weekly),
            "BIWEEKLY" => Some(Frequency::Biweekly),
            "MONTHLY" => Some(Frequency::Monthly),
            "CUSTOM" => Some(Frequency::Custom),
            _ => None,
        }
    }

    pub fn variants() -> &'static [(&'static str, &'static str)] {
        &[
            ("WEEKLY", "Every matching weekday"),
            ("BIWEEKLY", "Every other week from the anchor"),
            ("MONTHLY", "Same weekday slot of each month as the anchor"),
            ("CUSTOM", "Every skipWeeks + 1 weeks from the anchor"),
        ]
    }

    /// Length of the week cycle, or `None` for month-based cadences.
    pub fn week_period(&self, skip_weeks: u32) -> Option<i64> {
        match self {
            Frequency::Weekly => Some(1),
            Frequency::Biweekly => Some(2),
            Frequency::Custom => Some(i64::from(skip_weeks) + 1),
            Frequency::Monthly => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which occurrence of the route's weekday a monthly route lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthlySlot {
    Nth(u32),
    Last,
}

impl MonthlySlot {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            MonthlySlot::Nth(n) => calendar::weekday_ordinal(date) == *n,
            MonthlySlot::Last => calendar::is_last_weekday_of_month(date),
        }
    }

    /// The date this slot names in a given month, if the month has one.
    pub fn date_in(&self, year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
        match self {
            MonthlySlot::Nth(n) => calendar::nth_weekday(year, month, weekday, *n),
            MonthlySlot::Last => calendar::last_weekday(year, month, weekday),
        }
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// Accepts full names and three-letter abbreviations in any case.
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let wanted = value.trim().to_ascii_uppercase();
    ALL_WEEKDAYS.into_iter().find(|day| {
        let name = weekday_name(*day);
        wanted == name || (wanted.len() == 3 && name.starts_with(wanted.as_str()))
    })
}

/// A recurring service visit: one technician, one pool, one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RouteRecord", into = "RouteRecord")]
pub struct Route {
    pub id: i32,
    pub name: String,
    pub technician_id: Option<i32>,
    pub pool_id: Option<i32>,
    pub day_of_week: Weekday,
    pub frequency: Frequency,
    pub start_on: NaiveDate,
    pub stop_after: Option<NaiveDate>,
    pub skip_weeks: u32,
    pub anchor_date: Option<NaiveDate>,
    pub week_offset: u32,
    /// ISO week numbers that never get a visit, whatever the year.
    pub skip_week_numbers: BTreeSet<u32>,
    pub active: bool,
}

impl Route {
    pub fn new(id: i32, day_of_week: Weekday, frequency: Frequency, start_on: NaiveDate) -> Self {
        Self {
            id,
            name: String::new(),
            technician_id: None,
            pool_id: None,
            day_of_week,
            frequency,
            start_on,
            stop_after: None,
            skip_weeks: 0,
            anchor_date: None,
            week_offset: 0,
            skip_week_numbers: BTreeSet::new(),
            active: true,
        }
    }

    /// Reference date for cadence math; falls back to `start_on`.
    pub fn anchor(&self) -> NaiveDate {
        self.anchor_date.unwrap_or(self.start_on)
    }

    /// Slot derived from the first route weekday on or after the anchor.
    pub fn monthly_slot(&self) -> Option<MonthlySlot> {
        let occurrence = calendar::next_weekday_on_or_after(self.anchor(), self.day_of_week)?;
        if calendar::is_last_weekday_of_month(occurrence) {
            Some(MonthlySlot::Last)
        } else {
            Some(MonthlySlot::Nth(calendar::weekday_ordinal(occurrence)))
        }
    }

    pub fn validate(&self) -> Result<(), RouteConfigError> {
        route_validation::validate_route(self)
    }
}

fn default_active() -> bool {
    true
}

/// Wire shape of a route as exchanged with stores and clients.
///
/// Integers stay signed and enums stay textual here so that bad values are
/// reported as [`RouteConfigError`] instead of a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<i32>,
    pub day_of_week: String,
    pub frequency: String,
    pub start_on: NaiveDate,
    #[serde(default)]
    pub stop_after: Option<NaiveDate>,
    #[serde(default)]
    pub skip_weeks: i64,
    #[serde(default)]
    pub anchor_date: Option<NaiveDate>,
    #[serde(default)]
    pub week_offset: i64,
    #[serde(default)]
    pub skip_week_numbers: Vec<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl TryFrom<RouteRecord> for Route {
    type Error = RouteConfigError;

    fn try_from(record: RouteRecord) -> Result<Self, Self::Error> {
        route_validation::validate_record(&record)?;
        let route_id = record.id;
        let day_of_week = parse_weekday(&record.day_of_week).ok_or_else(|| {
            RouteConfigError::UnknownDayOfWeek {
                route_id,
                value: record.day_of_week.clone(),
            }
        })?;
        let frequency = Frequency::parse(&record.frequency).ok_or_else(|| {
            RouteConfigError::UnknownFrequency {
                route_id,
                value: record.frequency.clone(),
            }
        })?;
        let narrow = |field: &'static str, value: i64| {
            u32::try_from(value).map_err(|_| RouteConfigError::ValueOutOfRange {
                route_id,
                field,
                value,
            })
        };

        Ok(Self {
            id: route_id,
            name: record.name,
            technician_id: record.technician_id,
            pool_id: record.pool_id,
            day_of_week,
            frequency,
            start_on: record.start_on,
            stop_after: record.stop_after,
            skip_weeks: narrow("skipWeeks", record.skip_weeks)?,
            anchor_date: record.anchor_date,
            week_offset: narrow("weekOffset", record.week_offset)?,
            skip_week_numbers: record
                .skip_week_numbers
                .iter()
                .map(|&week| narrow("skipWeekNumbers", week))
                .collect::<Result<_, _>>()?,
            active: record.active,
        })
    }
}

impl From<Route> for RouteRecord {
    fn from(route: Route) -> Self {
        Self {
            id: route.id,
            name: route.name,
            technician_id: route.technician_id,
            pool_id: route.pool_id,
            day_of_week: weekday_name(route.day_of_week).to_string(),
            frequency: route.frequency.as_str().to_string(),
            start_on: route.start_on,
            stop_after: route.stop_after,
            skip_weeks: i64::from(route.skip_weeks),
            anchor_date: route.anchor_date,
            week_offset: i64::from(route.week_offset),
            skip_week_numbers: route
                .skip_week_numbers
                .iter()
                .map(|&week| i64::from(week))
                .collect(),
            active: route.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekday_parsing_is_lenient() {
        assert_eq!(parse_weekday("MONDAY"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("thursday"), Some(Weekday::Thu));
        assert_eq!(parse_weekday(" Sat "), Some(Weekday::Sat));
        assert_eq!(parse_weekday("Thur"), None);
        assert_eq!(parse_weekday("funday"), None);
    }

    #[test]
    fn deserializes_wire_record() {
        let value = json!({
            "id": 12,
            "name": "Henderson backyard",
            "technicianId": 3,
            "dayOfWeek": "MONDAY",
            "frequency": "biweekly",
            "startOn": "2024-01-01",
            "skipWeekNumbers": [52, 1],
            "weekOffset": 1
        });
        let route: Route = serde_json::from_value(value).unwrap();
        assert_eq!(route.day_of_week, Weekday::Mon);
        assert_eq!(route.frequency, Frequency::Biweekly);
        assert_eq!(route.technician_id, Some(3));
        assert_eq!(route.week_offset, 1);
        assert!(route.active);
        assert_eq!(route.skip_week_numbers.iter().copied().collect::<Vec<_>>(), vec![1, 52]);
        assert_eq!(route.anchor(), d(2024, 1, 1));
    }

    #[test]
    fn negative_offsets_fail_as_configuration_errors() {
        let value = json!({
            "id": 5,
            "dayOfWeek": "MONDAY",
            "frequency": "CUSTOM",
            "startOn": "2024-01-01",
            "skipWeeks": -1
        });
        let err = serde_json::from_value::<Route>(value).unwrap_err();
        assert!(err.to_string().contains("negative skipWeeks -1"));
    }

    #[test]
    fn unknown_frequency_is_reported() {
        let record = RouteRecord {
            id: 2,
            day_of_week: "MONDAY".into(),
            frequency: "FORTNIGHTLY".into(),
            start_on: d(2024, 1, 1),
            active: true,
            ..RouteRecord::default()
        };
        assert_eq!(
            Route::try_from(record),
            Err(RouteConfigError::UnknownFrequency {
                route_id: 2,
                value: "FORTNIGHTLY".into()
            })
        );
    }

    #[test]
    fn serializes_with_upper_case_names() {
        let mut route = Route::new(1, Weekday::Wed, Frequency::Monthly, d(2024, 2, 7));
        route.stop_after = Some(d(2024, 12, 31));
        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(value["dayOfWeek"], json!("WEDNESDAY"));
        assert_eq!(value["frequency"], json!("MONTHLY"));
        assert_eq!(value["stopAfter"], json!("2024-12-31"));
        let back: Route = serde_json::from_value(value).unwrap();
        assert_eq!(back, route);
    }

    #[test]
    fn monthly_slot_tracks_anchor_occurrence() {
        // 2024-01-17 is the third Wednesday of January
        let route = Route::new(1, Weekday::Wed, Frequency::Monthly, d(2024, 1, 17));
        assert_eq!(route.monthly_slot(), Some(MonthlySlot::Nth(3)));

        // 2024-01-31 is the fifth and last Wednesday
        let route = Route::new(1, Weekday::Wed, Frequency::Monthly, d(2024, 1, 31));
        assert_eq!(route.monthly_slot(), Some(MonthlySlot::Last));

        // Anchor on a Saturday rolls forward to Monday 2024-02-26, the last Monday
        let mut route = Route::new(1, Weekday::Mon, Frequency::Monthly, d(2024, 2, 1));
        route.anchor_date = Some(d(2024, 2, 24));
        assert_eq!(route.monthly_slot(), Some(MonthlySlot::Last));
    }

    #[test]
    fn slot_dates_agree_with_matching() {
        let third = MonthlySlot::Nth(3);
        assert_eq!(third.date_in(2024, 2, Weekday::Wed), Some(d(2024, 2, 21)));
        assert!(third.matches(d(2024, 2, 21)));
        assert_eq!(MonthlySlot::Nth(5).date_in(2024, 2, Weekday::Fri), None);
        let last = MonthlySlot::Last;
        assert_eq!(last.date_in(2024, 3, Weekday::Mon), Some(d(2024, 3, 25)));
        assert!(last.matches(d(2024, 3, 25)));
    }
}
