#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use route_schedule::{RouteBook, RouteStore, ServiceConfig, config, http_api};

    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServiceConfig::from_env();

    let mut book = RouteBook::new();
    if let Some(path) = &config.routes_path {
        let store = route_schedule::JsonRouteStore::new(path);
        match store.load_routes()? {
            Some(loaded) => book = loaded,
            None => tracing::info!(
                path = %store.path().display(),
                "no route file yet, starting empty"
            ),
        }
    }
    #[cfg(feature = "sqlite")]
    if let Some(path) = &config.sqlite_path {
        if let Some(loaded) = route_schedule::SqliteRouteStore::new(path)?.load_routes()? {
            book = loaded;
        }
    }

    let state = http_api::AppState::new(book).with_utc_offset(config.utc_offset());
    http_api::serve(config.http_addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
