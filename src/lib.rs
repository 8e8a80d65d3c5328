pub mod calendar;
pub mod config;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod resolver;
pub mod route;
pub mod route_book;
pub mod route_validation;

pub use calendar::CalendarContext;
pub use config::ServiceConfig;
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteRouteStore;
pub use persistence::{
    JsonRouteStore, PersistenceError, RouteStore, load_routes_from_csv, load_routes_from_json,
    save_routes_to_csv, save_routes_to_json,
};
pub use resolver::{
    Occurrences, is_due, is_due_today, next_due_date, next_due_date_inclusive,
    next_due_from_today, occurrences_in_range,
};
pub use route::{Frequency, MonthlySlot, Route, RouteRecord};
pub use route_book::{Assignment, Occurrence, RouteBook};
pub use route_validation::RouteConfigError;
