use std::sync::Arc;

use dotenv::dotenv;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tradedesk_core::config::Config;
use tradedesk_core::notify::{spawn_notifier, EventPublisher, LogSink};
use tradedesk_core::store::PgStore;
use tradedesk_core::{create_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting Tradedesk Core Server...");

    let config = Config::from_env()?;

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let (events, receiver) = EventPublisher::channel();
    let notifier = spawn_notifier(receiver, LogSink);

    let state = AppState::new(Arc::new(PgStore::new(pool)), events, &config.jwt_secret);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", address, e))?;

    info!("Server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    // The router (and its publishers) is gone, let pending events drain.
    notifier.await?;

    Ok(())
}
