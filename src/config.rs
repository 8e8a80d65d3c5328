use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::calendar::CalendarContext;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Runtime settings for the binaries, read from `ROUTE_SCHEDULE_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub http_addr: SocketAddr,
    /// Company timezone as minutes east of UTC.
    pub utc_offset_minutes: i32,
    pub routes_path: Option<PathBuf>,
    pub sqlite_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            utc_offset_minutes: 0,
            routes_path: None,
            sqlite_path: None,
        }
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

impl ServiceConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self::from_lookup(env_opt)
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    /// Unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_addr = lookup("ROUTE_SCHEDULE_HTTP_ADDR")
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string())
            .parse()
            .unwrap_or_else(|_| default_http_addr());
        let utc_offset_minutes = lookup("ROUTE_SCHEDULE_UTC_OFFSET_MINUTES")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .filter(|minutes| offset_from_minutes(*minutes).is_some())
            .unwrap_or(0);

        Self {
            http_addr,
            utc_offset_minutes,
            routes_path: lookup("ROUTE_SCHEDULE_ROUTES_PATH").map(PathBuf::from),
            sqlite_path: lookup("ROUTE_SCHEDULE_SQLITE_PATH").map(PathBuf::from),
        }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes).unwrap_or_else(|| Utc.fix())
    }

    pub fn calendar_context(&self) -> CalendarContext {
        CalendarContext::now(self.utc_offset())
    }
}
