use std::sync::Arc;

use taxonomy_db::config::{AppConfig, DatabaseBackend};
use taxonomy_db::handlers::AppState;
use taxonomy_db::seed;
use taxonomy_db::store::{MemoryStore, PostgresStore, Store};
use taxonomy_db::{build_app, serve};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::{Builder, Env};
    use log::LevelFilter;

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("sqlx", LevelFilter::Warn)
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{} backend={:?}",
        config.server.host,
        config.server.port,
        config.database.backend
    );

    match config.database.backend {
        DatabaseBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            let store = PostgresStore::new(&database_url, config.max_connections()).await?;

            log::info!("Running database migrations...");
            store.migrate().await?;

            run(store, config).await
        }
        DatabaseBackend::Memory => {
            log::warn!("Using the in-memory store; nothing is persisted");
            run(MemoryStore::new(), config).await
        }
    }
}

async fn run<S: Store + 'static>(store: S, config: AppConfig) -> anyhow::Result<()> {
    let store = Arc::new(store);

    // Load seed data (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
    }

    let bind_address = config.server_address();
    let app = build_app(AppState::from_arc(store, config));

    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Taxonomy server running on http://{}", bind_address);

    serve(listener, app).await
}
