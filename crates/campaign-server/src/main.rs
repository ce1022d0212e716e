mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use campaign_core::{AppConfig, StoreBackend};
use campaign_db::{MemoryTopicStore, PgTopicStore, TopicStore};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState, HttpOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = campaign_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::debug!(?config, "loaded configuration");

    let store = build_store(&config).await?;
    let options = HttpOptions::from_config(&config)?;
    let app = build_app(AppState { store }, &options);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        env = %config.env,
        store = %config.store,
        "campaign-server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn TopicStore>> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory topic store; data is lost on shutdown");
            Ok(Arc::new(MemoryTopicStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let pool_config = campaign_db::PoolConfig::from_app_config(config);
            let pool = campaign_db::connect_pool(database_url, pool_config).await?;
            let applied = campaign_db::run_migrations(&pool).await?;
            tracing::info!(applied, "database migrations up to date");
            Ok(Arc::new(PgTopicStore::new(pool)))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
