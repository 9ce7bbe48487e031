//! OpenSASE Orders - order processing and merchant settlement service

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opensase_orders::api::{router, AppState};
use opensase_orders::application::SettlementScheduler;
use opensase_orders::config::AppConfig;
use opensase_orders::domain::events::EventPublisher;
use opensase_orders::domain::repository::Repositories;
use opensase_orders::infrastructure::{InMemoryStore, NatsPublisher, NoopPublisher, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let repos = match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, config.database.max_connections, config.database.lock_timeout).await?;
            store.migrate().await?;
            tracing::info!("using Postgres store");
            Repositories::from_store(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Repositories::from_store(Arc::new(InMemoryStore::with_lock_timeout(config.database.lock_timeout)))
        }
    };

    let publisher: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match NatsPublisher::connect(url).await {
            Ok(publisher) => Arc::new(publisher),
            Err(err) => {
                tracing::warn!(error = %err, "NATS unavailable, events will not be published");
                Arc::new(NoopPublisher)
            }
        },
        None => Arc::new(NoopPublisher),
    };

    let state = AppState::new(repos, publisher, config.default_currency.clone(), config.retry);
    let shutdown = CancellationToken::new();
    let scheduler = config.settlement.enabled.then(|| {
        let scheduler = SettlementScheduler::new(state.settlement.clone(), config.settlement.run_at, config.settlement.timeout, shutdown.clone());
        tokio::spawn(scheduler.run())
    });

    let app = router(state);
    let addr = config.server.bind_addr();
    tracing::info!("🚀 OpenSASE Orders listening on {}", addr);
    let token = shutdown.clone();
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            token.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler {
        handle.await?;
    }
    Ok(())
}
