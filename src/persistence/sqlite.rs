use super::{PersistenceResult, RouteStore};
use crate::route::RouteRecord;
use crate::route_book::RouteBook;
use rusqlite::{Connection, params};
use std::sync::Mutex;
use tracing::info;

pub struct SqliteRouteStore {
    connection: Mutex<Connection>,
}

impl SqliteRouteStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY,
                route_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS route_store_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                saved_at TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }
}

impl RouteStore for SqliteRouteStore {
    fn save_routes(&self, book: &RouteBook) -> PersistenceResult<()> {
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM routes", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO routes (id, route_json) VALUES (?1, ?2)")?;
            for route in book.routes() {
                let json = serde_json::to_string(&RouteRecord::from(route.clone()))?;
                stmt.execute(params![route.id, json])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO route_store_state (id, saved_at) VALUES (1, datetime('now'))",
            [],
        )?;
        tx.commit()?;
        info!(routes = book.len(), "saved routes to sqlite");
        Ok(())
    }

    fn load_routes(&self) -> PersistenceResult<Option<RouteBook>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");

        let saved: i64 = conn.query_row("SELECT COUNT(*) FROM route_store_state", [], |row| {
            row.get(0)
        })?;
        if saved == 0 {
            return Ok(None);
        }

        let mut stmt = conn.prepare("SELECT route_json FROM routes ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for json in rows {
            let record: RouteRecord = serde_json::from_str(&json?)?;
            records.push(record);
        }

        let book = super::routes_from_records(records)?;
        info!(routes = book.len(), "loaded routes from sqlite");
        Ok(Some(book))
    }
}
