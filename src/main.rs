use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use estateserver::config::{AppConfig, StoreBackend};
use estateserver::notifier::{Notifier, SmtpNotifier};
use estateserver::shared::state::AppState;
use estateserver::store::{MemStore, PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("estateserver=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Memory => {
            info!("using in-memory store; data resets on restart");
            Arc::new(MemStore::new())
        }
        StoreBackend::Postgres => Arc::new(PgStore::connect(&config.database.url)?),
    };
    let notifier: Arc<dyn Notifier> = Arc::new(SmtpNotifier::new(&config.smtp)?);

    let addr = (config.server.host.clone(), config.server.port);
    let state = Arc::new(AppState {
        config,
        store,
        notifier,
    });
    let app = estateserver::api_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting HTTP server on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
