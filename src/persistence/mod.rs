use crate::route::{Route, RouteRecord};
use crate::route_book::RouteBook;
use crate::route_validation::RouteConfigError;
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    InvalidRoute(#[from] RouteConfigError),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait RouteStore {
    fn save_routes(&self, book: &RouteBook) -> PersistenceResult<()>;
    fn load_routes(&self) -> PersistenceResult<Option<RouteBook>>;
}

/// Narrow raw records into routes and check them as a collection. Every load
/// path funnels through here.
pub fn routes_from_records(records: Vec<RouteRecord>) -> PersistenceResult<RouteBook> {
    let routes = records
        .into_iter()
        .map(Route::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RouteBook::from_routes(routes)?)
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    JsonRouteStore, load_routes_from_csv, load_routes_from_json, save_routes_to_csv,
    save_routes_to_json,
};
