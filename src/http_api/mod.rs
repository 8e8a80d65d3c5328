use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{Assignment, CalendarContext, Route, RouteBook, RouteConfigError, resolver};

/// Longest `/calendar` window, matching the resolver's search horizon.
const MAX_CALENDAR_DAYS: i64 = resolver::SEARCH_HORIZON_WEEKS as i64 * 7;

#[derive(Clone)]
pub struct AppState {
    book: Arc<RwLock<RouteBook>>,
    utc_offset: FixedOffset,
    today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(book: RouteBook) -> Self {
        Self {
            book: Arc::new(RwLock::new(book)),
            utc_offset: Utc.fix(),
            today: None,
        }
    }

    /// Company timezone used to decide what "today" is.
    pub fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_fixed_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn book(&self) -> Arc<RwLock<RouteBook>> {
        self.book.clone()
    }

    fn calendar_context(&self) -> CalendarContext {
        match self.today {
            Some(today) => CalendarContext::new(today, self.utc_offset),
            None => CalendarContext::now(self.utc_offset),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

/// A route that reaches the resolver without passing validation means the
/// stored data is broken, not that the client sent something wrong.
impl From<RouteConfigError> for ApiError {
    fn from(value: RouteConfigError) -> Self {
        warn!(error = %value, "stored route failed validation");
        ApiError::Internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DateParams {
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NextParams {
    from: Option<String>,
    inclusive: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RangeParams {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DueResponse {
    route_id: i32,
    date: NaiveDate,
    due: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextDueResponse {
    route_id: i32,
    from: NaiveDate,
    next_due: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarResponse {
    route_id: i32,
    start: NaiveDate,
    end: NaiveDate,
    occurrences: Vec<NaiveDate>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/routes", get(list_routes).post(create_route))
        .route(
            "/routes/:id",
            get(get_route).put(update_route).delete(delete_route),
        )
        .route("/routes/:id/due", get(route_due))
        .route("/routes/:id/next", get(route_next))
        .route("/routes/:id/calendar", get(route_calendar))
        .route("/technicians/:id/assignments", get(technician_assignments))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "route schedule HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn parse_route(payload: serde_json::Value) -> Result<Route, ApiError> {
    serde_json::from_value(payload).map_err(|err| ApiError::invalid(err.to_string()))
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                ApiError::invalid(format!("{field} must be a YYYY-MM-DD date (got '{raw}')"))
            })
        })
        .transpose()
}

fn required_date(field: &str, value: Option<&str>) -> Result<NaiveDate, ApiError> {
    parse_date(field, value)?
        .ok_or_else(|| ApiError::invalid(format!("missing query parameter '{field}'")))
}

/// Clone a stored route out of the book, re-checking it before it is handed
/// to the resolver.
fn resolvable_route(state: &AppState, route_id: i32) -> Result<Route, ApiError> {
    let book = state.book();
    let route = {
        let guard = book.read();
        guard.find(route_id).cloned()
    };
    let route = route.ok_or_else(|| ApiError::not_found(format!("route {route_id} not found")))?;
    route.validate()?;
    Ok(route)
}

async fn list_routes(State(state): State<AppState>) -> Json<Vec<Route>> {
    let book = state.book();
    let routes = {
        let guard = book.read();
        guard.to_vec()
    };
    Json(routes)
}

async fn get_route(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
) -> Result<Json<Route>, ApiError> {
    let book = state.book();
    let result = {
        let guard = book.read();
        guard.find(route_id).cloned()
    };
    match result {
        Some(route) => Ok(Json(route)),
        None => Err(ApiError::not_found(format!("route {route_id} not found"))),
    }
}

async fn create_route(
    State(state): State<AppState>,
    Json(mut payload): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    let book = state.book();
    let route = {
        let mut guard = book.write();
        // routes posted without an id take the next free one
        if let Some(fields) = payload.as_object_mut() {
            if !fields.contains_key("id") {
                fields.insert("id".to_string(), json!(guard.next_id()));
            }
        }
        let route = parse_route(payload)?;
        match guard.insert(route.clone()) {
            Ok(()) => {}
            Err(RouteConfigError::DuplicateRouteId(id)) => {
                return Err(ApiError::Conflict(format!("route {id} already exists")));
            }
            Err(err) => return Err(ApiError::invalid(err.to_string())),
        }
        route
    };
    info!(route_id = route.id, "route created");
    Ok((StatusCode::CREATED, Json(route)))
}

async fn update_route(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<Route>, ApiError> {
    let route = parse_route(payload)?;
    if route.id != route_id {
        return Err(ApiError::invalid(
            "route id in payload does not match path parameter",
        ));
    }
    let book = state.book();
    {
        let mut guard = book.write();
        if guard.find(route_id).is_none() {
            return Err(ApiError::not_found(format!("route {route_id} not found")));
        }
        guard
            .upsert(route.clone())
            .map_err(|err| ApiError::invalid(err.to_string()))?;
    }
    Ok(Json(route))
}

async fn delete_route(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let book = state.book();
    let removed = {
        let mut guard = book.write();
        guard.delete(route_id)
    };
    match removed {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::not_found(format!("route {route_id} not found"))),
    }
}

async fn route_due(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
    Query(params): Query<DateParams>,
) -> Result<Json<DueResponse>, ApiError> {
    let date = match parse_date("date", params.date.as_deref())? {
        Some(date) => date,
        None => state.calendar_context().today(),
    };
    let route = resolvable_route(&state, route_id)?;
    Ok(Json(DueResponse {
        route_id,
        date,
        due: resolver::is_due(&route, date),
    }))
}

async fn route_next(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
    Query(params): Query<NextParams>,
) -> Result<Json<NextDueResponse>, ApiError> {
    let route = resolvable_route(&state, route_id)?;
    // an explicit `from` is exclusive by default, "from today" is inclusive
    let (from, next_due) = match parse_date("from", params.from.as_deref())? {
        Some(from) if params.inclusive.unwrap_or(false) => {
            (from, resolver::next_due_date_inclusive(&route, from))
        }
        Some(from) => (from, resolver::next_due_date(&route, from)),
        None => {
            let context = state.calendar_context();
            let today = context.today();
            if params.inclusive.unwrap_or(true) {
                (today, resolver::next_due_from_today(&route, &context))
            } else {
                (today, resolver::next_due_date(&route, today))
            }
        }
    };
    Ok(Json(NextDueResponse {
        route_id,
        from,
        next_due,
    }))
}

async fn route_calendar(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
    Query(params): Query<RangeParams>,
) -> Result<Json<CalendarResponse>, ApiError> {
    let start = required_date("start", params.start.as_deref())?;
    let end = required_date("end", params.end.as_deref())?;
    if end < start {
        return Err(ApiError::invalid("end must not precede start"));
    }
    if (end - start).num_days() > MAX_CALENDAR_DAYS {
        return Err(ApiError::invalid(format!(
            "calendar range may span at most {MAX_CALENDAR_DAYS} days"
        )));
    }
    let route = resolvable_route(&state, route_id)?;
    let occurrences = resolver::occurrences_in_range(&route, start, end).collect();
    Ok(Json(CalendarResponse {
        route_id,
        start,
        end,
        occurrences,
    }))
}

async fn technician_assignments(
    State(state): State<AppState>,
    Path(technician_id): Path<i32>,
    Query(params): Query<DateParams>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    let date = match parse_date("date", params.date.as_deref())? {
        Some(date) => date,
        None => state.calendar_context().today(),
    };
    let book = state.book();
    let assignments = {
        let guard = book.read();
        for route in guard
            .routes()
            .filter(|route| route.technician_id == Some(technician_id))
        {
            route.validate()?;
        }
        guard.assignments_for(technician_id, date)
    };
    Ok(Json(assignments))
}
