use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use filmorate::{
    api::{create_router, AppState},
    config::Config,
    storage::{InMemoryStorage, PgStorage, Storage},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("filmorate=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match (&config.database_url, &config.seed_path) {
        (Some(url), _) => {
            tracing::info!(max_connections = config.max_connections, "Using Postgres storage");
            Arc::new(PgStorage::connect(url, config.max_connections).await?)
        }
        (None, Some(path)) => {
            tracing::info!(seed = %path, "Using in-memory storage from seed");
            Arc::new(InMemoryStorage::load_seed(path).await?)
        }
        (None, None) => {
            tracing::warn!("No DATABASE_URL or SEED_PATH set, starting with empty in-memory storage");
            Arc::new(InMemoryStorage::new())
        }
    };

    let app = create_router(AppState::new(storage));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app).await?;
    Ok(())
}
