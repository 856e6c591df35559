//! Messaging Platform Server - Main Entry Point

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use mp_server::messages::{InMemoryMessageStore, MessageStore, PgMessageStore};
use mp_server::messenger::{ChannelClient, DispatchConfig, Dispatcher};
use mp_server::{analytics, api, config, db};

/// How long shutdown waits for queued sub-events to finish.
const DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mp_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Messaging Platform Server"
    );

    // Initialize message store
    let store: Arc<dyn MessageStore> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgMessageStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, messages are kept in memory and lost on restart");
            Arc::new(InMemoryMessageStore::new())
        }
    };

    // Start sub-event dispatch
    let (dispatcher, dispatch_worker) =
        Dispatcher::spawn(Arc::clone(&store), DispatchConfig::from_config(&config));

    // Optional analytics summary in the logs
    let reporter = config.analytics_report_interval_secs.map(|secs| {
        info!(interval_secs = secs, "Analytics summary reporter enabled");
        analytics::spawn_summary_reporter(Arc::clone(&store), Duration::from_secs(secs))
    });

    let channel =
        ChannelClient::from_config(&config).context("Failed to build channel HTTP client")?;

    // Build application state
    let state = api::AppState::new(store, config.clone(), dispatcher, channel);

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    if let Some(reporter) = reporter {
        reporter.abort();
    }

    // The router held the last dispatcher handle; wait for queued work
    if tokio::time::timeout(DISPATCH_DRAIN_TIMEOUT, dispatch_worker)
        .await
        .is_err()
    {
        warn!("Timed out waiting for queued sub-events to finish");
    }

    info!("Server shutdown complete");

    Ok(())
}
