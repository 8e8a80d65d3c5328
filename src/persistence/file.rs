use super::{PersistenceError, PersistenceResult, RouteStore};
use crate::route::RouteRecord;
use crate::route_book::RouteBook;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize, Deserialize)]
struct RouteBookSnapshot {
    routes: Vec<RouteRecord>,
}

impl RouteBookSnapshot {
    fn from_book(book: &RouteBook) -> Self {
        Self {
            routes: book.to_vec().into_iter().map(RouteRecord::from).collect(),
        }
    }

    fn into_book(self) -> PersistenceResult<RouteBook> {
        super::routes_from_records(self.routes)
    }
}

pub fn save_routes_to_json<P: AsRef<Path>>(book: &RouteBook, path: P) -> PersistenceResult<()> {
    let snapshot = RouteBookSnapshot::from_book(book);
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    info!(path = %path.as_ref().display(), routes = book.len(), "saved routes to json");
    Ok(())
}

pub fn load_routes_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<RouteBook> {
    let file = File::open(path.as_ref())?;
    let snapshot: RouteBookSnapshot = serde_json::from_reader(file)?;
    let book = snapshot.into_book()?;
    info!(path = %path.as_ref().display(), routes = book.len(), "loaded routes from json");
    Ok(book)
}

/// A JSON snapshot file used as a route store. A missing file reads as
/// "nothing stored yet".
pub struct JsonRouteStore {
    path: PathBuf,
}

impl JsonRouteStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RouteStore for JsonRouteStore {
    fn save_routes(&self, book: &RouteBook) -> PersistenceResult<()> {
        save_routes_to_json(book, &self.path)
    }

    fn load_routes(&self) -> PersistenceResult<Option<RouteBook>> {
        match load_routes_from_json(&self.path) {
            Ok(book) => Ok(Some(book)),
            Err(PersistenceError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

const CSV_HEADERS: [&str; 13] = [
    "id",
    "name",
    "technician_id",
    "pool_id",
    "day_of_week",
    "frequency",
    "start_on",
    "stop_after",
    "skip_weeks",
    "anchor_date",
    "week_offset",
    "skip_week_numbers",
    "active",
];

#[derive(Default, Serialize, Deserialize)]
struct RouteCsvRecord {
    id: i32,
    name: String,
    technician_id: String,
    pool_id: String,
    day_of_week: String,
    frequency: String,
    start_on: String,
    stop_after: String,
    skip_weeks: String,
    anchor_date: String,
    week_offset: String,
    skip_week_numbers: String,
    active: String,
}

impl From<&RouteRecord> for RouteCsvRecord {
    fn from(record: &RouteRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            technician_id: format_option_i32(record.technician_id),
            pool_id: format_option_i32(record.pool_id),
            day_of_week: record.day_of_week.clone(),
            frequency: record.frequency.clone(),
            start_on: format_date(Some(record.start_on)),
            stop_after: format_date(record.stop_after),
            skip_weeks: record.skip_weeks.to_string(),
            anchor_date: format_date(record.anchor_date),
            week_offset: record.week_offset.to_string(),
            skip_week_numbers: join_i64(&record.skip_week_numbers),
            active: record.active.to_string(),
        }
    }
}

impl RouteCsvRecord {
    fn into_route_record(self) -> PersistenceResult<RouteRecord> {
        let start_on = parse_date(&self.start_on)?.ok_or_else(|| {
            PersistenceError::InvalidData(format!("route {} is missing start_on", self.id))
        })?;
        Ok(RouteRecord {
            id: self.id,
            name: self.name,
            technician_id: parse_i32(&self.technician_id)?,
            pool_id: parse_i32(&self.pool_id)?,
            day_of_week: self.day_of_week,
            frequency: self.frequency,
            start_on,
            stop_after: parse_date(&self.stop_after)?,
            skip_weeks: parse_i64(&self.skip_weeks)?.unwrap_or(0),
            anchor_date: parse_date(&self.anchor_date)?,
            week_offset: parse_i64(&self.week_offset)?.unwrap_or(0),
            skip_week_numbers: split_i64(&self.skip_week_numbers)?,
            active: parse_bool(&self.active)?.unwrap_or(true),
        })
    }
}

pub fn save_routes_to_csv<P: AsRef<Path>>(book: &RouteBook, path: P) -> PersistenceResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = csv::Writer::from_writer(file);
    // serialize() only emits the header alongside the first row
    if book.is_empty() {
        writer.write_record(CSV_HEADERS)?;
    }
    for route in book.routes() {
        let record = RouteRecord::from(route.clone());
        writer.serialize(RouteCsvRecord::from(&record))?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), routes = book.len(), "saved routes to csv");
    Ok(())
}

pub fn load_routes_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<RouteBook> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for row in reader.deserialize::<RouteCsvRecord>() {
        records.push(row?.into_route_record()?);
    }

    let book = super::routes_from_records(records)?;
    info!(path = %path.as_ref().display(), routes = book.len(), "loaded routes from csv");
    Ok(book)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(input: &str) -> PersistenceResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_i64(input: &str) -> PersistenceResult<Option<i64>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<i64>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid integer '{input}': {e}")))
}

fn format_option_i32(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_i32(input: &str) -> PersistenceResult<Option<i32>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<i32>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid integer '{input}': {e}")))
}

fn parse_bool(input: &str) -> PersistenceResult<Option<bool>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    match input.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid boolean '{other}'"
        ))),
    }
}

fn join_i64(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn split_i64(input: &str) -> PersistenceResult<Vec<i64>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(',')
        .map(|part| {
            part.trim().parse::<i64>().map_err(|e| {
                PersistenceError::InvalidData(format!("invalid integer '{part}': {e}"))
            })
        })
        .collect()
}
